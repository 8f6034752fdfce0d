use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use aquadash_core::error::CoreError;
use aquadash_platform::PlatformError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`PlatformError`] for failures
/// of the upstream Telemetry Platform, and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `aquadash_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failed call to the Telemetry Platform.
    #[error(transparent)]
    Platform(PlatformError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<PlatformError> for AppError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Core(core) => AppError::Core(core),
            other => AppError::Platform(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Platform(err) => classify_platform_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Classify a platform failure into an HTTP status, error code, and message.
///
/// - 401 from the platform (or an unreadable token) maps to 401.
/// - Other 4xx responses keep their status under `PLATFORM_ERROR`.
/// - Timeouts map to 504; 5xx, transport and decode failures to 502.
fn classify_platform_error(err: &PlatformError) -> (StatusCode, &'static str, String) {
    match err {
        PlatformError::Unauthorized(body) => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            platform_message(body).unwrap_or_else(|| "Session expired or invalid".to_string()),
        ),
        PlatformError::Api { status, body } if (400..500).contains(status) => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST);
            let message = platform_message(body)
                .unwrap_or_else(|| format!("Telemetry platform rejected the request ({status})"));
            (status, "PLATFORM_ERROR", message)
        }
        PlatformError::Request(e) if e.is_timeout() => {
            tracing::warn!(error = %e, "Telemetry platform timed out");
            (
                StatusCode::GATEWAY_TIMEOUT,
                "GATEWAY_TIMEOUT",
                "The telemetry platform did not respond in time".to_string(),
            )
        }
        PlatformError::Core(core) => classify_core_error(core),
        other => {
            tracing::error!(error = %other, "Telemetry platform failure");
            (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "The telemetry platform is unavailable".to_string(),
            )
        }
    }
}

/// The platform reports errors as `{"status": .., "message": ..}`; fall back
/// to the raw body when it is short plain text.
fn platform_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string);
    }
    let trimmed = body.trim();
    (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
}
