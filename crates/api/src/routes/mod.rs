pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod devices;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/user                                       current user (requires auth)
///
/// /admin/customers                                 list, create/update (tenant admin)
/// /admin/customers/{id}                            delete
/// /admin/customers/{id}/users                      list customer users
/// /admin/users                                     create/update
/// /admin/users/{id}                                delete
/// /admin/devices                                   create/update
/// /admin/devices/{id}                              delete
///
/// /devices                                         devices visible to the caller
/// /devices/{id}/keys                               telemetry keys
/// /devices/{id}/telemetry                          read (GET), write (POST)
/// /devices/{id}/alarms                             alarms
///
/// /user/dashboard                                  get config
/// /user/dashboard/widgets                          replace widget list (PUT)
/// /user/dashboard/layout                           replace grid layout (PUT)
///
/// /dashboard/widgets/{id}/data                     current data for one widget
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication routes (login, refresh, current user).
        .nest("/auth", auth::router())
        // Tenant registry: customers, users, devices.
        .nest("/admin", admin::router())
        // Device telemetry and alarms.
        .nest("/devices", devices::router())
        // Per-user dashboard configuration.
        .nest("/user/dashboard", dashboard::user_router())
        // Widget data polling.
        .nest("/dashboard", dashboard::router())
}
