//! The explicit platform session passed to every platform call.
//!
//! A [`PlatformSession`] is built once per request from the bearer token the
//! client presents. The token is issued and signed by the Telemetry Platform;
//! this service only reads its claims (identity, authority, expiry) and
//! leaves signature verification to the platform, which re-checks the token
//! on every forwarded call.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use aquadash_core::types::{EntityUuid, Timestamp};

use crate::error::PlatformError;
use crate::models::non_null_id;

/// Platform role carried in the token's `scopes` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authority {
    SysAdmin,
    TenantAdmin,
    CustomerUser,
}

impl Authority {
    pub fn as_str(self) -> &'static str {
        match self {
            Authority::SysAdmin => "SYS_ADMIN",
            Authority::TenantAdmin => "TENANT_ADMIN",
            Authority::CustomerUser => "CUSTOMER_USER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SYS_ADMIN" => Some(Authority::SysAdmin),
            "TENANT_ADMIN" => Some(Authority::TenantAdmin),
            "CUSTOMER_USER" => Some(Authority::CustomerUser),
            _ => None,
        }
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims the platform embeds in its access tokens.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformClaims {
    /// The user's email.
    pub sub: String,
    pub user_id: EntityUuid,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub tenant_id: Option<EntityUuid>,
    #[serde(default)]
    pub customer_id: Option<EntityUuid>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// An authenticated platform session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSession {
    pub token: String,
    pub user_id: EntityUuid,
    pub email: String,
    pub authority: Authority,
    pub tenant_id: Option<EntityUuid>,
    pub customer_id: Option<EntityUuid>,
    pub expires_at: Timestamp,
}

impl PlatformSession {
    /// Read a platform access token. Fails with
    /// [`PlatformError::Unauthorized`] if the token is malformed, expired,
    /// or carries no known authority.
    pub fn from_token(token: &str) -> Result<Self, PlatformError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_aud = false;

        let claims = decode::<PlatformClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    PlatformError::Unauthorized("Session expired".into())
                }
                _ => PlatformError::Unauthorized("Invalid platform token".into()),
            })?
            .claims;

        let authority = claims
            .scopes
            .iter()
            .find_map(|s| Authority::parse(s))
            .ok_or_else(|| PlatformError::Unauthorized("Token carries no authority".into()))?;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| PlatformError::Unauthorized("Invalid token expiry".into()))?;

        Ok(Self {
            token: token.to_string(),
            user_id: claims.user_id,
            email: claims.sub,
            authority,
            tenant_id: non_null_id(claims.tenant_id),
            customer_id: non_null_id(claims.customer_id),
            expires_at,
        })
    }

    /// Value for the platform's `X-Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn is_tenant_admin(&self) -> bool {
        self.authority == Authority::TenantAdmin
    }
}
