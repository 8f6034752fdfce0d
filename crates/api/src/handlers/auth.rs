//! Handlers for the `/auth` resource (login, refresh, current user).
//!
//! Credentials and refresh tokens are passed straight through to the
//! Telemetry Platform, which issues the tokens.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use aquadash_core::types::{EntityUuid, Timestamp};
use aquadash_platform::models::{self, TokenPair, User};
use aquadash_platform::{Authority, PlatformSession};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthSession;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Timestamp,
    pub user: SessionInfo,
}

/// Identity carried by the access token.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: EntityUuid,
    pub email: String,
    pub authority: Authority,
    pub tenant_id: Option<EntityUuid>,
    pub customer_id: Option<EntityUuid>,
}

impl AuthResponse {
    fn from_tokens(tokens: TokenPair) -> AppResult<Self> {
        let session = PlatformSession::from_token(&tokens.token)?;
        Ok(Self {
            access_token: tokens.token,
            refresh_token: tokens.refresh_token,
            expires_at: session.expires_at,
            user: SessionInfo {
                id: session.user_id,
                email: session.email,
                authority: session.authority,
                tenant_id: session.tenant_id,
                customer_id: session.customer_id,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    if input.username.trim().is_empty() || input.password.is_empty() {
        return Err(AppError::BadRequest(
            "username and password are required".into(),
        ));
    }

    let tokens = state
        .platform
        .login(&models::LoginRequest {
            username: input.username,
            password: input.password,
        })
        .await?;
    let response = AuthResponse::from_tokens(tokens)?;

    tracing::info!(
        user_id = %response.user.id,
        authority = %response.user.authority,
        "User logged in"
    );
    Ok(Json(DataResponse { data: response }))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    if input.refresh_token.trim().is_empty() {
        return Err(AppError::BadRequest("refresh_token is required".into()));
    }

    let tokens = state.platform.refresh(&input.refresh_token).await?;
    let response = AuthResponse::from_tokens(tokens)?;
    Ok(Json(DataResponse { data: response }))
}

/// GET /api/v1/auth/user
pub async fn current_user(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = state.platform.current_user(&session).await?;
    Ok(Json(DataResponse { data: user }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use uuid::Uuid;

    fn platform_token(scopes: &[&str]) -> String {
        let claims = json!({
            "sub": "operator@aquadash.test",
            "userId": Uuid::from_u128(7),
            "scopes": scopes,
            "customerId": "13814000-1dd2-11b2-8080-808080808080",
            "exp": chrono::Utc::now().timestamp() + 600,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"k")).unwrap()
    }

    #[test]
    fn auth_response_carries_token_identity() {
        let tokens = TokenPair {
            token: platform_token(&["TENANT_ADMIN"]),
            refresh_token: "r".into(),
        };
        let response = AuthResponse::from_tokens(tokens).unwrap();
        assert_eq!(response.user.id, Uuid::from_u128(7));
        assert_eq!(response.user.authority, Authority::TenantAdmin);
        assert_eq!(response.user.customer_id, None);
        assert_eq!(response.refresh_token, "r");
    }

    #[test]
    fn auth_response_rejects_token_without_authority() {
        let tokens = TokenPair {
            token: platform_token(&["REFRESH_TOKEN"]),
            refresh_token: "r".into(),
        };
        assert_matches!(AuthResponse::from_tokens(tokens), Err(AppError::Platform(_)));
    }
}
