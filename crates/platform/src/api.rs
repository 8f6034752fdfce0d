//! REST API client for the Telemetry Platform.
//!
//! One [`PlatformClient`] is shared by the whole server; it holds the
//! connection pool and the per-call timeout. Every authenticated call takes
//! the caller's [`PlatformSession`] and forwards its token in the
//! platform's `X-Authorization` header.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use aquadash_core::telemetry::{TelemetrySeries, TimeRange};
use aquadash_core::types::EntityUuid;

use crate::error::PlatformError;
use crate::models::{
    Alarm, AttributeKv, Customer, Device, LoginRequest, PageData, PageLink, RefreshRequest,
    TokenPair, User,
};
use crate::session::PlatformSession;

/// Header the platform reads the bearer token from.
pub const AUTH_HEADER: &str = "X-Authorization";

/// Attribute scope the dashboard config is stored in. Server-scope
/// attributes are invisible to devices.
pub const ATTRIBUTE_SCOPE: &str = "SERVER_SCOPE";

/// HTTP client for the Telemetry Platform.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
}

impl PlatformClient {
    /// Create a client with its own connection pool.
    ///
    /// * `base_url` - e.g. `https://platform.example.org`.
    /// * `timeout` - applied to every call, connect through body.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- auth ----

    /// `POST /api/auth/login`. Public.
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenPair, PlatformError> {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /api/auth/token`. Public; exchanges a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, PlatformError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let response = self
            .client
            .post(self.url("/api/auth/token"))
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn current_user(&self, session: &PlatformSession) -> Result<User, PlatformError> {
        self.get_json(session, "/api/auth/user", &[]).await
    }

    // ---- customers ----

    pub async fn list_customers(
        &self,
        session: &PlatformSession,
        page: PageLink,
    ) -> Result<PageData<Customer>, PlatformError> {
        self.get_json(session, "/api/customers", &page.query()).await
    }

    pub async fn save_customer(
        &self,
        session: &PlatformSession,
        customer: &Customer,
    ) -> Result<Customer, PlatformError> {
        self.post_json(session, "/api/customer", &[], customer).await
    }

    pub async fn delete_customer(
        &self,
        session: &PlatformSession,
        customer_id: EntityUuid,
    ) -> Result<(), PlatformError> {
        self.delete(session, &format!("/api/customer/{customer_id}"))
            .await
    }

    pub async fn list_customer_users(
        &self,
        session: &PlatformSession,
        customer_id: EntityUuid,
        page: PageLink,
    ) -> Result<PageData<User>, PlatformError> {
        self.get_json(
            session,
            &format!("/api/customer/{customer_id}/users"),
            &page.query(),
        )
        .await
    }

    // ---- users ----

    /// Create or update a user without sending the platform's activation mail.
    pub async fn save_user(
        &self,
        session: &PlatformSession,
        user: &User,
    ) -> Result<User, PlatformError> {
        self.post_json(
            session,
            "/api/user",
            &[("sendActivationMail", "false".to_string())],
            user,
        )
        .await
    }

    pub async fn delete_user(
        &self,
        session: &PlatformSession,
        user_id: EntityUuid,
    ) -> Result<(), PlatformError> {
        self.delete(session, &format!("/api/user/{user_id}")).await
    }

    // ---- devices ----

    pub async fn list_tenant_devices(
        &self,
        session: &PlatformSession,
        page: PageLink,
    ) -> Result<PageData<Device>, PlatformError> {
        self.get_json(session, "/api/tenant/devices", &page.query())
            .await
    }

    pub async fn list_customer_devices(
        &self,
        session: &PlatformSession,
        customer_id: EntityUuid,
        page: PageLink,
    ) -> Result<PageData<Device>, PlatformError> {
        self.get_json(
            session,
            &format!("/api/customer/{customer_id}/devices"),
            &page.query(),
        )
        .await
    }

    pub async fn save_device(
        &self,
        session: &PlatformSession,
        device: &Device,
    ) -> Result<Device, PlatformError> {
        self.post_json(session, "/api/device", &[], device).await
    }

    pub async fn delete_device(
        &self,
        session: &PlatformSession,
        device_id: EntityUuid,
    ) -> Result<(), PlatformError> {
        self.delete(session, &format!("/api/device/{device_id}"))
            .await
    }

    // ---- telemetry ----

    pub async fn telemetry_keys(
        &self,
        session: &PlatformSession,
        device_id: EntityUuid,
    ) -> Result<Vec<String>, PlatformError> {
        self.get_json(
            session,
            &format!("/api/plugins/telemetry/DEVICE/{device_id}/keys/timeseries"),
            &[],
        )
        .await
    }

    /// Latest values, or a ranged read when `range` has bounds.
    pub async fn read_telemetry(
        &self,
        session: &PlatformSession,
        device_id: EntityUuid,
        keys: &[String],
        range: TimeRange,
    ) -> Result<TelemetrySeries, PlatformError> {
        range.validate()?;
        let mut query = vec![("keys", keys.join(","))];
        if let (Some(start), Some(end)) = (range.start_ts, range.end_ts) {
            query.push(("startTs", start.to_string()));
            query.push(("endTs", end.to_string()));
        }
        if let Some(limit) = range.limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_json(
            session,
            &format!("/api/plugins/telemetry/DEVICE/{device_id}/values/timeseries"),
            &query,
        )
        .await
    }

    /// Append one point per key, timestamped by the platform.
    pub async fn write_telemetry(
        &self,
        session: &PlatformSession,
        device_id: EntityUuid,
        values: &Map<String, Value>,
    ) -> Result<(), PlatformError> {
        let response = self
            .authed(
                Method::POST,
                &format!("/api/plugins/telemetry/DEVICE/{device_id}/timeseries/ANY"),
                session,
            )
            .json(values)
            .send()
            .await?;
        Self::check_status(response).await
    }

    pub async fn device_alarms(
        &self,
        session: &PlatformSession,
        device_id: EntityUuid,
        page: PageLink,
    ) -> Result<PageData<Alarm>, PlatformError> {
        self.get_json(
            session,
            &format!("/api/alarm/DEVICE/{device_id}"),
            &page.query(),
        )
        .await
    }

    // ---- attributes ----

    pub async fn read_user_attributes(
        &self,
        session: &PlatformSession,
        user_id: EntityUuid,
        keys: &[&str],
    ) -> Result<Vec<AttributeKv>, PlatformError> {
        self.get_json(
            session,
            &format!("/api/plugins/telemetry/USER/{user_id}/values/attributes/{ATTRIBUTE_SCOPE}"),
            &[("keys", keys.join(","))],
        )
        .await
    }

    pub async fn write_user_attributes(
        &self,
        session: &PlatformSession,
        user_id: EntityUuid,
        attributes: &Map<String, Value>,
    ) -> Result<(), PlatformError> {
        let response = self
            .authed(
                Method::POST,
                &format!("/api/plugins/telemetry/USER/{user_id}/attributes/{ATTRIBUTE_SCOPE}"),
                session,
            )
            .json(attributes)
            .send()
            .await?;
        Self::check_status(response).await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, method: Method, path: &str, session: &PlatformSession) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(AUTH_HEADER, session.bearer())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        session: &PlatformSession,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let response = self
            .authed(Method::GET, path, session)
            .query(query)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        session: &PlatformSession,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T, PlatformError> {
        let response = self
            .authed(Method::POST, path, session)
            .query(query)
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn delete(&self, session: &PlatformSession, path: &str) -> Result<(), PlatformError> {
        let response = self.authed(Method::DELETE, path, session).send().await?;
        Self::check_status(response).await
    }

    /// Ensure the response has a success status code. A 401 means the
    /// session is no longer valid; any other failure keeps the status and
    /// body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PlatformError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        if status == StatusCode::UNAUTHORIZED {
            return Err(PlatformError::Unauthorized(body));
        }
        Err(PlatformError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PlatformError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| PlatformError::Decode(e.to_string()))
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), PlatformError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
