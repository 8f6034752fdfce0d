//! Tenant-admin handlers for the customer, user and device registries.
//!
//! These are pass-through proxies: the request is checked for the fields the
//! platform requires and forwarded with the caller's token. All endpoints
//! require [`RequireTenantAdmin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use aquadash_core::error::CoreError;
use aquadash_core::types::EntityUuid;
use aquadash_platform::models::{Customer, Device, PageData, User};
use aquadash_platform::Authority;

use crate::error::AppResult;
use crate::middleware::rbac::RequireTenantAdmin;
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/customers
pub async fn list_customers(
    RequireTenantAdmin(session): RequireTenantAdmin,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<PageData<Customer>>>> {
    let page = params.page_link();
    page.validate()?;
    let customers = state.platform.list_customers(&session, page).await?;
    Ok(Json(DataResponse { data: customers }))
}

/// POST /api/v1/admin/customers
///
/// Creates a customer, or updates it when the body carries an `id`.
pub async fn save_customer(
    RequireTenantAdmin(session): RequireTenantAdmin,
    State(state): State<AppState>,
    Json(input): Json<Customer>,
) -> AppResult<(StatusCode, Json<DataResponse<Customer>>)> {
    require_non_blank(&input.title, "customer title")?;
    let status = created_or_ok(input.id.is_none());

    let customer = state.platform.save_customer(&session, &input).await?;
    tracing::info!(title = %customer.title, "Customer saved");
    Ok((status, Json(DataResponse { data: customer })))
}

/// DELETE /api/v1/admin/customers/{id}
pub async fn delete_customer(
    RequireTenantAdmin(session): RequireTenantAdmin,
    State(state): State<AppState>,
    Path(id): Path<EntityUuid>,
) -> AppResult<StatusCode> {
    state.platform.delete_customer(&session, id).await?;
    tracing::info!(customer_id = %id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/customers/{id}/users
pub async fn list_customer_users(
    RequireTenantAdmin(session): RequireTenantAdmin,
    State(state): State<AppState>,
    Path(id): Path<EntityUuid>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<PageData<User>>>> {
    let page = params.page_link();
    page.validate()?;
    let users = state
        .platform
        .list_customer_users(&session, id, page)
        .await?;
    Ok(Json(DataResponse { data: users }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/users
///
/// Customer users must name their customer; the activation mail is never
/// sent.
pub async fn save_user(
    RequireTenantAdmin(session): RequireTenantAdmin,
    State(state): State<AppState>,
    Json(input): Json<User>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    require_non_blank(&input.email, "user email")?;
    if !input.email.contains('@') {
        return Err(CoreError::Validation(format!("'{}' is not an email address", input.email)).into());
    }
    match Authority::parse(&input.authority) {
        Some(Authority::CustomerUser) if input.customer_id.is_none() => {
            return Err(CoreError::Validation(
                "customer users must have a customerId".into(),
            )
            .into());
        }
        Some(Authority::CustomerUser) | Some(Authority::TenantAdmin) => {}
        _ => {
            return Err(CoreError::Validation(format!(
                "authority must be TENANT_ADMIN or CUSTOMER_USER, got '{}'",
                input.authority
            ))
            .into());
        }
    }
    let status = created_or_ok(input.id.is_none());

    let user = state.platform.save_user(&session, &input).await?;
    tracing::info!(email = %user.email, authority = %user.authority, "User saved");
    Ok((status, Json(DataResponse { data: user })))
}

/// DELETE /api/v1/admin/users/{id}
pub async fn delete_user(
    RequireTenantAdmin(session): RequireTenantAdmin,
    State(state): State<AppState>,
    Path(id): Path<EntityUuid>,
) -> AppResult<StatusCode> {
    if id == session.user_id {
        return Err(CoreError::Conflict("cannot delete the signed-in user".into()).into());
    }
    state.platform.delete_user(&session, id).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/devices
pub async fn save_device(
    RequireTenantAdmin(session): RequireTenantAdmin,
    State(state): State<AppState>,
    Json(input): Json<Device>,
) -> AppResult<(StatusCode, Json<DataResponse<Device>>)> {
    require_non_blank(&input.name, "device name")?;
    let status = created_or_ok(input.id.is_none());

    let device = state.platform.save_device(&session, &input).await?;
    tracing::info!(name = %device.name, "Device saved");
    Ok((status, Json(DataResponse { data: device })))
}

/// DELETE /api/v1/admin/devices/{id}
pub async fn delete_device(
    RequireTenantAdmin(session): RequireTenantAdmin,
    State(state): State<AppState>,
    Path(id): Path<EntityUuid>,
) -> AppResult<StatusCode> {
    state.platform.delete_device(&session, id).await?;
    tracing::info!(device_id = %id, "Device deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_non_blank(value: &str, what: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

fn created_or_ok(is_new: bool) -> StatusCode {
    if is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}
