//! Handlers for devices visible to the caller, their telemetry and alarms.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};

use aquadash_core::error::CoreError;
use aquadash_core::telemetry::{parse_keys, validate_telemetry_write, TelemetrySeries};
use aquadash_core::types::{EntityUuid, EpochMillis};
use aquadash_platform::models::{Alarm, Device, PageData};
use aquadash_platform::Authority;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthSession;
use crate::query::{PageParams, RangeParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query params for `GET /devices/{id}/telemetry`.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Comma-separated telemetry keys.
    pub keys: String,
    pub start_ts: Option<EpochMillis>,
    pub end_ts: Option<EpochMillis>,
    pub limit: Option<u32>,
}

/// GET /api/v1/devices
///
/// Tenant admins see every tenant device; customer users see the devices
/// assigned to their customer.
pub async fn list_devices(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<PageData<Device>>>> {
    let page = params.page_link();
    page.validate()?;

    let devices = match (session.authority, session.customer_id) {
        (Authority::TenantAdmin, _) => state.platform.list_tenant_devices(&session, page).await?,
        (Authority::CustomerUser, Some(customer_id)) => {
            state
                .platform
                .list_customer_devices(&session, customer_id, page)
                .await?
        }
        (Authority::CustomerUser, None) => {
            return Err(CoreError::Forbidden("User is not assigned to a customer".into()).into());
        }
        (Authority::SysAdmin, _) => {
            return Err(
                CoreError::Forbidden("System administrators have no devices".into()).into(),
            );
        }
    };
    Ok(Json(DataResponse { data: devices }))
}

/// GET /api/v1/devices/{id}/keys
pub async fn telemetry_keys(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(device_id): Path<EntityUuid>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let keys = state.platform.telemetry_keys(&session, device_id).await?;
    Ok(Json(DataResponse { data: keys }))
}

/// GET /api/v1/devices/{id}/telemetry?keys=a,b[&start_ts&end_ts&limit]
///
/// Latest values without a range, otherwise the points inside it.
pub async fn read_telemetry(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(device_id): Path<EntityUuid>,
    Query(params): Query<TelemetryQuery>,
) -> AppResult<Json<DataResponse<TelemetrySeries>>> {
    let keys = parse_keys(&params.keys);
    if keys.is_empty() {
        return Err(AppError::BadRequest("keys must name at least one key".into()));
    }
    let range = RangeParams {
        start_ts: params.start_ts,
        end_ts: params.end_ts,
        limit: params.limit,
    }
    .time_range();
    range.validate()?;

    let series = state
        .platform
        .read_telemetry(&session, device_id, &keys, range)
        .await?;
    Ok(Json(DataResponse { data: series }))
}

/// POST /api/v1/devices/{id}/telemetry
///
/// Body is a flat `{key: value}` object; one point per key is appended.
pub async fn write_telemetry(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(device_id): Path<EntityUuid>,
    Json(values): Json<Map<String, Value>>,
) -> AppResult<StatusCode> {
    validate_telemetry_write(&values)?;
    state
        .platform
        .write_telemetry(&session, device_id, &values)
        .await?;

    tracing::debug!(
        device_id = %device_id,
        keys = values.len(),
        "Telemetry written"
    );
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/devices/{id}/alarms
pub async fn device_alarms(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(device_id): Path<EntityUuid>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<PageData<Alarm>>>> {
    let page = params.page_link();
    page.validate()?;
    let alarms = state
        .platform
        .device_alarms(&session, device_id, page)
        .await?;
    Ok(Json(DataResponse { data: alarms }))
}
