//! Bearer-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use aquadash_core::error::CoreError;
use aquadash_platform::PlatformSession;

use crate::error::AppError;
use crate::state::AppState;

/// The caller's platform session, built from the platform access token in
/// the `Authorization: Bearer <token>` header.
///
/// The token is forwarded to the platform on every call made on the
/// caller's behalf, so the platform stays the authority on its validity.
///
/// ```ignore
/// async fn my_handler(AuthSession(session): AuthSession) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %session.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession(pub PlatformSession);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Invalid Authorization format. Expected: Bearer <token>".into(),
                ))
            })?;

        let session = PlatformSession::from_token(token)?;
        Ok(AuthSession(session))
    }
}
