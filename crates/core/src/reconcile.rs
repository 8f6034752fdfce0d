//! Dashboard configuration reconciler.
//!
//! Turns the widget list submitted at the end of an edit session into the
//! next persisted [`DashboardConfig`]: drafts are validated, merged into the
//! current config by the placement engine, and anything the drafts no
//! longer mention is deleted from both the widgets and the layout.

use std::collections::HashSet;

use serde::Serialize;

use crate::dashboard::DashboardConfig;
use crate::error::CoreError;
use crate::placement::place_widgets;
use crate::types::WidgetId;
use crate::widget::{validate_drafts, ValidDraft, WidgetDraft};

/// Which widget ids a reconciliation added, updated, and removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub added: Vec<WidgetId>,
    pub updated: Vec<WidgetId>,
    pub removed: Vec<WidgetId>,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// The next config plus what changed relative to the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub config: DashboardConfig,
    pub summary: ReconcileSummary,
}

/// Validate `drafts` and reconcile them against `current`.
pub fn reconcile(
    drafts: Vec<WidgetDraft>,
    current: &DashboardConfig,
) -> Result<Reconciled, CoreError> {
    let drafts = validate_drafts(drafts)?;
    Ok(reconcile_valid(&drafts, current))
}

/// Reconcile drafts that already passed [`validate_drafts`].
pub fn reconcile_valid(drafts: &[ValidDraft], current: &DashboardConfig) -> Reconciled {
    let placed = place_widgets(drafts, &current.widgets, &current.layout);
    let config = DashboardConfig {
        widgets: placed.widgets,
        layout: placed.layout,
    };
    let summary = summarize(current, &config);
    Reconciled { config, summary }
}

fn summarize(previous: &DashboardConfig, next: &DashboardConfig) -> ReconcileSummary {
    let before: HashSet<WidgetId> = previous.widgets.iter().map(|w| w.id).collect();
    let after: HashSet<WidgetId> = next.widgets.iter().map(|w| w.id).collect();

    let added = next
        .widgets
        .iter()
        .filter(|w| !before.contains(&w.id))
        .map(|w| w.id)
        .collect();

    let updated = next
        .widgets
        .iter()
        .filter(|w| previous.widget(w.id).is_some_and(|old| old != *w))
        .map(|w| w.id)
        .collect();

    let mut removed: Vec<WidgetId> = Vec::new();
    for w in &previous.widgets {
        if !after.contains(&w.id) && !removed.contains(&w.id) {
            removed.push(w.id);
        }
    }

    ReconcileSummary {
        added,
        updated,
        removed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
