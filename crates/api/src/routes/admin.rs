//! Route definitions for the tenant registry at `/admin`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. Every route requires a tenant admin.
///
/// ```text
/// GET    /customers             -> list_customers
/// POST   /customers             -> save_customer
/// DELETE /customers/{id}        -> delete_customer
/// GET    /customers/{id}/users  -> list_customer_users
/// POST   /users                 -> save_user
/// DELETE /users/{id}            -> delete_user
/// POST   /devices               -> save_device
/// DELETE /devices/{id}          -> delete_device
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/customers",
            get(admin::list_customers).post(admin::save_customer),
        )
        .route("/customers/{id}", delete(admin::delete_customer))
        .route("/customers/{id}/users", get(admin::list_customer_users))
        .route("/users", post(admin::save_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/devices", post(admin::save_device))
        .route("/devices/{id}", delete(admin::delete_device))
}
