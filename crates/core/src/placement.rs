//! Widget placement engine.
//!
//! Assigns grid coordinates to widgets that do not have a layout entry yet,
//! leaving existing placements untouched. Placement is a pure function of
//! the existing layout and the ordered list of size requests: the same
//! inputs always give the same coordinates, and a different order of the
//! same requests may give a different (still non-overlapping) layout.

use std::collections::HashSet;

use crate::layout::{GridPosition, GridRect, LayoutEntry, WidgetSize, GRID_COLUMNS};
use crate::types::WidgetId;
use crate::widget::{ValidDraft, Widget};

/// Where the next auto-placed widget starts, given the current layout.
///
/// * Empty layout: the origin.
/// * Otherwise the cursor packs into the last row (the entries with the
///   largest `y`), right of its rightmost widget, as long as that is before
///   the last column. When the last row is full it starts a new row below
///   the lowest bottom edge of the whole layout.
pub fn compute_initial_placement(existing: &[LayoutEntry]) -> GridPosition {
    let Some(max_y) = existing.iter().map(|e| e.y).max() else {
        return GridPosition::ORIGIN;
    };
    let max_bottom = existing.iter().map(LayoutEntry::bottom).max().unwrap_or(0);
    let rightmost_x = existing
        .iter()
        .filter(|e| e.y == max_y)
        .map(LayoutEntry::right)
        .max()
        .unwrap_or(0);

    if rightmost_x < GRID_COLUMNS {
        GridPosition::new(rightmost_x, max_y)
    } else {
        GridPosition::new(0, max_bottom)
    }
}

/// Running state while auto-placing one batch of widgets.
///
/// `bottom` is the lowest bottom edge of everything placed so far, which is
/// where a wrapped row starts. `occupied` holds every reserved rectangle so
/// a candidate never lands on top of a hand-arranged widget.
#[derive(Debug, Clone)]
pub struct PlacementCursor {
    position: GridPosition,
    bottom: u32,
    occupied: Vec<GridRect>,
}

impl PlacementCursor {
    /// Start a cursor after `existing`. Entries outside the grid are ignored.
    pub fn new(existing: &[LayoutEntry]) -> Self {
        let in_grid: Vec<LayoutEntry> = existing
            .iter()
            .filter(|e| e.is_within_grid())
            .copied()
            .collect();

        Self {
            position: compute_initial_placement(&in_grid),
            bottom: in_grid.iter().map(LayoutEntry::bottom).max().unwrap_or(0),
            occupied: in_grid.iter().map(LayoutEntry::rect).collect(),
        }
    }

    /// Current cursor position.
    pub fn position(&self) -> GridPosition {
        self.position
    }

    /// Reserve a cell rectangle of `size` at or after the cursor and advance
    /// the cursor right past it.
    ///
    /// Widths are clamped to the grid and heights to at least one row, so
    /// the call always succeeds.
    pub fn place(&mut self, size: WidgetSize) -> GridPosition {
        let size = WidgetSize::new(size.w.clamp(1, GRID_COLUMNS), size.h.max(1));
        let mut candidate = self.position;

        loop {
            if candidate.x.saturating_add(size.w) > GRID_COLUMNS {
                candidate = GridPosition::new(0, self.bottom.max(candidate.y.saturating_add(1)));
                continue;
            }
            let rect = GridRect::new(candidate, size);
            match self.occupied.iter().find(|o| o.overlaps(&rect)) {
                Some(blocker) => candidate.x = blocker.right(),
                None => break,
            }
        }

        let rect = GridRect::new(candidate, size);
        self.occupied.push(rect);
        self.bottom = self.bottom.max(rect.bottom());
        self.position = GridPosition::new(rect.right(), candidate.y);
        candidate
    }
}

/// Place an ordered list of size requests after `existing`.
pub fn place_sizes(existing: &[LayoutEntry], sizes: &[WidgetSize]) -> Vec<GridPosition> {
    let mut cursor = PlacementCursor::new(existing);
    sizes.iter().map(|size| cursor.place(*size)).collect()
}

/// Result of [`place_widgets`]: both lists hold exactly the draft ids.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementResult {
    pub widgets: Vec<Widget>,
    pub layout: Vec<LayoutEntry>,
}

/// Merge validated drafts into the existing widgets and layout.
///
/// For each draft, in order:
/// * an existing widget with the same id is overwritten in place and keeps
///   its layout entry; if it has none, one is placed at the cursor;
/// * otherwise the widget is new and is placed at the cursor with its
///   requested size.
///
/// Existing entries outside the grid, and entries that overlap an earlier
/// kept entry, are not kept; their widgets are placed again. Afterwards
/// every widget and entry whose id is not in `drafts` is dropped.
pub fn place_widgets(
    drafts: &[ValidDraft],
    existing_widgets: &[Widget],
    existing_layout: &[LayoutEntry],
) -> PlacementResult {
    let mut widgets = dedup_widgets(existing_widgets);
    let known: HashSet<WidgetId> = widgets.iter().map(|w| w.id).collect();
    let keep: HashSet<WidgetId> = drafts.iter().map(ValidDraft::id).collect();

    // Entries left behind under the id of a widget that is now being added
    // are stale and must not reserve space.
    let mut layout = drop_overlapping(dedup_entries(
        existing_layout
            .iter()
            .filter(|e| e.is_within_grid())
            .filter(|e| known.contains(&e.i) || !keep.contains(&e.i)),
    ));
    let mut cursor = PlacementCursor::new(&layout);

    for draft in drafts {
        let id = draft.id();
        match widgets.iter_mut().find(|w| w.id == id) {
            Some(existing) => {
                *existing = draft.widget.clone();
                if !layout.iter().any(|e| e.i == id) {
                    let position = cursor.place(draft.size);
                    layout.push(LayoutEntry::new(id, position, draft.size));
                }
            }
            None => {
                widgets.push(draft.widget.clone());
                let position = cursor.place(draft.size);
                layout.push(LayoutEntry::new(id, position, draft.size));
            }
        }
    }

    widgets.retain(|w| keep.contains(&w.id));
    layout.retain(|e| keep.contains(&e.i));

    PlacementResult { widgets, layout }
}

/// Keep the first widget for each id.
fn dedup_widgets(widgets: &[Widget]) -> Vec<Widget> {
    let mut seen = HashSet::new();
    widgets
        .iter()
        .filter(|w| seen.insert(w.id))
        .cloned()
        .collect()
}

/// Keep each entry only if it does not overlap one kept before it.
fn drop_overlapping(entries: Vec<LayoutEntry>) -> Vec<LayoutEntry> {
    let mut kept: Vec<LayoutEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if !kept.iter().any(|k| k.rect().overlaps(&entry.rect())) {
            kept.push(entry);
        }
    }
    kept
}

/// Keep the first layout entry for each id.
pub(crate) fn dedup_entries<'a>(
    entries: impl Iterator<Item = &'a LayoutEntry>,
) -> Vec<LayoutEntry> {
    let mut seen = HashSet::new();
    entries.filter(|e| seen.insert(e.i)).copied().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
