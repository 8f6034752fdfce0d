use axum::routing::get;
use axum::Router;

use crate::handlers::devices;
use crate::state::AppState;

/// Routes mounted at `/devices`.
///
/// ```text
/// GET  /                 -> list_devices
/// GET  /{id}/keys        -> telemetry_keys
/// GET  /{id}/telemetry   -> read_telemetry
/// POST /{id}/telemetry   -> write_telemetry
/// GET  /{id}/alarms      -> device_alarms
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(devices::list_devices))
        .route("/{id}/keys", get(devices::telemetry_keys))
        .route(
            "/{id}/telemetry",
            get(devices::read_telemetry).post(devices::write_telemetry),
        )
        .route("/{id}/alarms", get(devices::device_alarms))
}
