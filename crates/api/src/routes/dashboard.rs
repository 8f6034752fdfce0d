//! Route definitions for the user dashboard.
//!
//! Two routers are provided:
//! - `user_router()` for the stored config, mounted at `/user/dashboard`
//! - `router()` for widget data polling, mounted at `/dashboard`

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::dashboard;
use crate::state::AppState;

/// Dashboard config routes mounted at `/user/dashboard`.
///
/// ```text
/// GET /         -> get_dashboard
/// PUT /widgets  -> save_widgets
/// PUT /layout   -> save_layout
/// ```
pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::get_dashboard))
        .route("/widgets", put(dashboard::save_widgets))
        .route("/layout", put(dashboard::save_layout))
}

/// Widget data routes mounted at `/dashboard`.
///
/// ```text
/// GET /widgets/{id}/data  -> widget_data
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/widgets/{id}/data", get(dashboard::widget_data))
}
