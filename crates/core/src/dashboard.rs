//! The persisted dashboard configuration and its consistency rules.
//!
//! A [`DashboardConfig`] is the unit of persistence: it is stored as one
//! opaque attribute blob per user on the Telemetry Platform. Every widget
//! must have exactly one layout entry and every entry must belong to a
//! widget.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::layout::{find_overlap, validate_layout_entry, LayoutEntry};
use crate::placement::dedup_entries;
use crate::types::WidgetId;
use crate::widget::Widget;

/// Widgets plus their grid placements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(default)]
    pub layout: Vec<LayoutEntry>,
}

impl DashboardConfig {
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty() && self.layout.is_empty()
    }

    pub fn widget(&self, id: WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn layout_entry(&self, id: WidgetId) -> Option<&LayoutEntry> {
        self.layout.iter().find(|e| e.i == id)
    }

    /// SHA-256 hex fingerprint of the canonical JSON encoding.
    ///
    /// Two configs have the same revision exactly when they serialize to the
    /// same bytes, so the revision works as an optimistic-concurrency token
    /// against a store that has no version field of its own.
    pub fn revision(&self) -> String {
        // Derived structs with string keys always encode.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// Drop widgets without a layout entry, entries without a widget, and
/// repeated ids (the first occurrence wins).
pub fn prune_orphans(config: DashboardConfig) -> DashboardConfig {
    let mut seen = HashSet::new();
    let widgets: Vec<Widget> = config
        .widgets
        .into_iter()
        .filter(|w| seen.insert(w.id))
        .collect();
    let layout = dedup_entries(config.layout.iter());

    let widget_ids: HashSet<WidgetId> = widgets.iter().map(|w| w.id).collect();
    let entry_ids: HashSet<WidgetId> = layout.iter().map(|e| e.i).collect();

    DashboardConfig {
        widgets: widgets
            .into_iter()
            .filter(|w| entry_ids.contains(&w.id))
            .collect(),
        layout: layout
            .into_iter()
            .filter(|e| widget_ids.contains(&e.i))
            .collect(),
    }
}

/// Verify the invariants a config must satisfy before it is persisted:
/// unique ids, a one-to-one widget/entry correspondence, every entry inside
/// the grid, and no overlapping entries.
pub fn check_consistency(config: &DashboardConfig) -> Result<(), CoreError> {
    let mut widget_ids = HashSet::with_capacity(config.widgets.len());
    for widget in &config.widgets {
        if !widget_ids.insert(widget.id) {
            return Err(CoreError::Validation(format!(
                "widget id {} appears more than once",
                widget.id
            )));
        }
    }

    let mut entry_ids = HashSet::with_capacity(config.layout.len());
    for entry in &config.layout {
        if !entry_ids.insert(entry.i) {
            return Err(CoreError::Validation(format!(
                "layout entry for widget {} appears more than once",
                entry.i
            )));
        }
        if !widget_ids.contains(&entry.i) {
            return Err(CoreError::Validation(format!(
                "layout entry {} has no matching widget",
                entry.i
            )));
        }
        validate_layout_entry(entry)?;
    }

    if let Some(missing) = config.widgets.iter().find(|w| !entry_ids.contains(&w.id)) {
        return Err(CoreError::Validation(format!(
            "widget {} has no layout entry",
            missing.id
        )));
    }

    if let Some((a, b)) = find_overlap(&config.layout) {
        return Err(CoreError::Validation(format!(
            "layout entries {a} and {b} overlap"
        )));
    }

    Ok(())
}

/// Replace the layout after a manual drag/resize in layout-edit mode.
///
/// The new layout must place exactly the config's widgets, stay inside the
/// grid, and not overlap. Widgets are left as they are.
pub fn apply_layout(
    config: &DashboardConfig,
    layout: Vec<LayoutEntry>,
) -> Result<DashboardConfig, CoreError> {
    let updated = DashboardConfig {
        widgets: config.widgets.clone(),
        layout,
    };
    check_consistency(&updated)?;
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
