//! Handlers for the per-user dashboard.
//!
//! The dashboard config (widgets plus grid layout) is stored on the
//! Telemetry Platform as one attribute of the signed-in user. Saving the
//! widget list runs the reconciler: existing placements are kept, new
//! widgets are auto-placed, and widgets missing from the submitted list are
//! deleted together with their layout entries.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use aquadash_core::dashboard::{apply_layout, DashboardConfig};
use aquadash_core::error::CoreError;
use aquadash_core::layout::LayoutEntry;
use aquadash_core::reconcile::ReconcileSummary;
use aquadash_core::session::DashboardSession;
use aquadash_core::types::WidgetId;
use aquadash_core::widget::WidgetDraft;
use aquadash_platform::polling::{fetch_widget_data, WidgetData};

use crate::error::AppResult;
use crate::middleware::auth::AuthSession;
use crate::query::RangeParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A dashboard config with the revision to send back on the next save.
#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub config: DashboardConfig,
    pub revision: String,
}

impl From<DashboardConfig> for DashboardView {
    fn from(config: DashboardConfig) -> Self {
        let revision = config.revision();
        Self { config, revision }
    }
}

/// Result of saving the widget list.
#[derive(Debug, Serialize)]
pub struct SavedDashboard {
    #[serde(flatten)]
    pub view: DashboardView,
    pub summary: ReconcileSummary,
}

/// Request body for `PUT /user/dashboard/widgets`.
#[derive(Debug, Deserialize)]
pub struct SaveWidgetsRequest {
    pub widgets: Vec<WidgetDraft>,
    /// Revision the edit started from. When given, the save fails with 409
    /// if the stored dashboard changed in the meantime.
    pub base_revision: Option<String>,
}

/// Request body for `PUT /user/dashboard/layout`.
#[derive(Debug, Deserialize)]
pub struct SaveLayoutRequest {
    pub layout: Vec<LayoutEntry>,
    pub base_revision: Option<String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// GET /api/v1/user/dashboard
///
/// An empty config for users who never saved one.
pub async fn get_dashboard(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DashboardView>>> {
    let config = state.dashboards.load(&session).await?;
    Ok(Json(DataResponse {
        data: config.into(),
    }))
}

/// PUT /api/v1/user/dashboard/widgets
///
/// Replace the widget list. The response carries the config as stored after
/// the write, which is the new source of truth for the client.
pub async fn save_widgets(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(input): Json<SaveWidgetsRequest>,
) -> AppResult<Json<DataResponse<SavedDashboard>>> {
    let current = state.dashboards.load(&session).await?;

    let mut edit = DashboardSession::viewing(current);
    edit.begin_edit()?;
    edit.replace_drafts(input.widgets)?;
    let reconciled = edit.prepare_save()?;

    let unchanged = reconciled.summary.is_noop() && &reconciled.config == edit.config();
    let stale = input
        .base_revision
        .as_deref()
        .is_some_and(|base| base != edit.config().revision());

    let saved = if unchanged && !stale {
        tracing::debug!(user_id = %session.user_id, "Dashboard unchanged; skipping write");
        reconciled.config
    } else {
        state
            .dashboards
            .save(&session, reconciled.config, input.base_revision.as_deref())
            .await?
    };
    edit.commit_saved(saved)?;

    tracing::info!(
        user_id = %session.user_id,
        added = reconciled.summary.added.len(),
        updated = reconciled.summary.updated.len(),
        removed = reconciled.summary.removed.len(),
        "Dashboard widgets saved"
    );

    Ok(Json(DataResponse {
        data: SavedDashboard {
            view: edit.config().clone().into(),
            summary: reconciled.summary,
        },
    }))
}

/// PUT /api/v1/user/dashboard/layout
///
/// Replace the grid layout after a manual drag/resize. The layout must
/// place exactly the dashboard's widgets, inside the grid, without overlap.
pub async fn save_layout(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(input): Json<SaveLayoutRequest>,
) -> AppResult<Json<DataResponse<DashboardView>>> {
    let current = state.dashboards.load(&session).await?;
    let updated = apply_layout(&current, input.layout)?;

    let saved = state
        .dashboards
        .save(&session, updated, input.base_revision.as_deref())
        .await?;

    tracing::info!(
        user_id = %session.user_id,
        entries = saved.layout.len(),
        "Dashboard layout saved"
    );
    Ok(Json(DataResponse { data: saved.into() }))
}

// ---------------------------------------------------------------------------
// Widget data
// ---------------------------------------------------------------------------

/// GET /api/v1/dashboard/widgets/{id}/data[?start_ts&end_ts&limit]
///
/// Current data for one widget of the caller's dashboard. Devices that
/// fail to answer show up as empty values.
pub async fn widget_data(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(widget_id): Path<WidgetId>,
    Query(params): Query<RangeParams>,
) -> AppResult<Json<DataResponse<WidgetData>>> {
    let config = state.dashboards.load(&session).await?;
    let widget = config.widget(widget_id).ok_or_else(|| CoreError::NotFound {
        entity: "Widget",
        id: widget_id.to_string(),
    })?;

    let data = fetch_widget_data(&state.platform, &session, widget, params.time_range()).await?;
    Ok(Json(DataResponse { data }))
}
