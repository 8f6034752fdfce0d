use aquadash_core::error::CoreError;

/// Errors from talking to the Telemetry Platform.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform rejected the session token (HTTP 401), or the token
    /// could not be read as a platform session.
    #[error("Platform session rejected: {0}")]
    Unauthorized(String),

    /// The platform returned a non-2xx status other than 401.
    #[error("Platform API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose body did not have the expected shape.
    #[error("Failed to decode platform response: {0}")]
    Decode(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PlatformError {
    /// `true` when the caller's session is no longer valid and the client
    /// should log in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PlatformError::Unauthorized(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PlatformError::Request(e) if e.is_timeout())
    }
}
