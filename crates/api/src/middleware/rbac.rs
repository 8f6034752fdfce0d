//! Role-based access control extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use aquadash_core::error::CoreError;
use aquadash_platform::PlatformSession;

use super::auth::AuthSession;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `TENANT_ADMIN` authority. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireTenantAdmin(session): RequireTenantAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireTenantAdmin(pub PlatformSession);

impl FromRequestParts<AppState> for RequireTenantAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthSession(session) = AuthSession::from_request_parts(parts, state).await?;
        if !session.is_tenant_admin() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Tenant admin authority required".into(),
            )));
        }
        Ok(RequireTenantAdmin(session))
    }
}
