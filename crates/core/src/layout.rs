//! Grid geometry for dashboard layouts.
//!
//! The dashboard is a fixed-width grid of [`GRID_COLUMNS`] columns and an
//! unbounded number of rows. Every widget occupies one [`LayoutEntry`], a
//! rectangle of whole grid cells keyed by the widget id.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::WidgetId;

// ---------------------------------------------------------------------------
// Grid constants
// ---------------------------------------------------------------------------

/// Number of columns in the dashboard grid.
pub const GRID_COLUMNS: u32 = 12;

/// Width given to a new widget whose draft does not declare one.
pub const DEFAULT_WIDGET_WIDTH: u32 = 3;

/// Height given to a new widget whose draft does not declare one.
pub const DEFAULT_WIDGET_HEIGHT: u32 = 2;

/// Maximum height of a single widget, in rows.
pub const MAX_WIDGET_HEIGHT: u32 = 24;

/// Width assumed for a stored layout entry that carries no `w`.
pub const MISSING_ENTRY_WIDTH: u32 = 0;

/// Height assumed for a stored layout entry that carries no `h`.
pub const MISSING_ENTRY_HEIGHT: u32 = 1;

fn missing_entry_width() -> u32 {
    MISSING_ENTRY_WIDTH
}

fn missing_entry_height() -> u32 {
    MISSING_ENTRY_HEIGHT
}

fn lenient_coord<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    lenient_cell(deserializer, 0)
}

fn lenient_width<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    lenient_cell(deserializer, MISSING_ENTRY_WIDTH)
}

fn lenient_height<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    lenient_cell(deserializer, MISSING_ENTRY_HEIGHT)
}

/// Decode one grid cell count from any JSON value.
///
/// Numbers are floored and clamped to `0..=u32::MAX`; anything else decodes
/// as `fallback`.
fn lenient_cell<'de, D: Deserializer<'de>>(
    deserializer: D,
    fallback: u32,
) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if let Some(n) = value.as_u64() {
        return Ok(u32::try_from(n).unwrap_or(u32::MAX));
    }
    let cell = match value.as_f64() {
        Some(n) if n.is_finite() => n.floor().clamp(0.0, f64::from(u32::MAX)) as u32,
        _ => fallback,
    };
    tracing::warn!(value = %value, cell, "Malformed layout cell value in stored layout");
    Ok(cell)
}

// ---------------------------------------------------------------------------
// Positions, sizes, rectangles
// ---------------------------------------------------------------------------

/// Top-left cell of a widget, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: u32,
    pub y: u32,
}

impl GridPosition {
    pub const ORIGIN: GridPosition = GridPosition { x: 0, y: 0 };

    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Width and height of a widget, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetSize {
    pub w: u32,
    pub h: u32,
}

impl WidgetSize {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

impl Default for WidgetSize {
    fn default() -> Self {
        Self {
            w: DEFAULT_WIDGET_WIDTH,
            h: DEFAULT_WIDGET_HEIGHT,
        }
    }
}

/// A half-open rectangle of grid cells, `[x, x + w) × [y, y + h)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl GridRect {
    pub fn new(position: GridPosition, size: WidgetSize) -> Self {
        Self {
            x: position.x,
            y: position.y,
            w: size.w,
            h: size.h,
        }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// Returns `true` if the two rectangles share at least one cell.
    ///
    /// Zero-area rectangles never overlap anything.
    pub fn overlaps(&self, other: &GridRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

// ---------------------------------------------------------------------------
// Layout entries
// ---------------------------------------------------------------------------

/// Grid placement of one widget. `i` is the id of the widget it places.
///
/// Stored blobs written by older clients may omit coordinates or sizes.
/// Missing `x`/`y` decode as `0`, a missing `w` as [`MISSING_ENTRY_WIDTH`]
/// and a missing `h` as [`MISSING_ENTRY_HEIGHT`]. Negative or fractional
/// numbers are clamped to whole cells and non-numbers fall back to the same
/// defaults, so one bad value never fails the whole blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub i: WidgetId,
    #[serde(default, deserialize_with = "lenient_coord")]
    pub x: u32,
    #[serde(default, deserialize_with = "lenient_coord")]
    pub y: u32,
    #[serde(default = "missing_entry_width", deserialize_with = "lenient_width")]
    pub w: u32,
    #[serde(default = "missing_entry_height", deserialize_with = "lenient_height")]
    pub h: u32,
}

impl LayoutEntry {
    pub fn new(i: WidgetId, position: GridPosition, size: WidgetSize) -> Self {
        Self {
            i,
            x: position.x,
            y: position.y,
            w: size.w,
            h: size.h,
        }
    }

    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.x, self.y)
    }

    pub fn size(&self) -> WidgetSize {
        WidgetSize::new(self.w, self.h)
    }

    pub fn rect(&self) -> GridRect {
        GridRect::new(self.position(), self.size())
    }

    /// Column just past the entry's right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.rect().right()
    }

    /// Row just below the entry's bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.rect().bottom()
    }

    /// Returns `true` if the entry has a non-empty area and fits inside the
    /// grid's column count.
    pub fn is_within_grid(&self) -> bool {
        self.w >= 1 && self.h >= 1 && self.right() <= GRID_COLUMNS
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a requested widget size.
///
/// Width must be in `1..=GRID_COLUMNS`, height in `1..=MAX_WIDGET_HEIGHT`.
pub fn validate_widget_size(size: WidgetSize) -> Result<(), CoreError> {
    if !(1..=GRID_COLUMNS).contains(&size.w) {
        return Err(CoreError::Validation(format!(
            "widget width must be between 1 and {GRID_COLUMNS}, got {}",
            size.w
        )));
    }
    if !(1..=MAX_WIDGET_HEIGHT).contains(&size.h) {
        return Err(CoreError::Validation(format!(
            "widget height must be between 1 and {MAX_WIDGET_HEIGHT}, got {}",
            size.h
        )));
    }
    Ok(())
}

/// Validate a single layout entry against the grid bounds.
pub fn validate_layout_entry(entry: &LayoutEntry) -> Result<(), CoreError> {
    validate_widget_size(entry.size())?;
    if entry.right() > GRID_COLUMNS {
        return Err(CoreError::Validation(format!(
            "layout entry {} spans columns {}..{}, beyond the {GRID_COLUMNS}-column grid",
            entry.i,
            entry.x,
            entry.right()
        )));
    }
    Ok(())
}

/// Find the first pair of entries whose rectangles overlap, if any.
pub fn find_overlap(layout: &[LayoutEntry]) -> Option<(WidgetId, WidgetId)> {
    layout.iter().enumerate().find_map(|(idx, a)| {
        layout[idx + 1..]
            .iter()
            .find(|b| a.rect().overlaps(&b.rect()))
            .map(|b| (a.i, b.i))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
