#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Map, Value};
use tower::ServiceExt;
use uuid::Uuid;

use aquadash_api::config::ServerConfig;
use aquadash_api::router::build_app_router;
use aquadash_api::state::AppState;

// ---------------------------------------------------------------------------
// Fixed identities
// ---------------------------------------------------------------------------

pub const TENANT_ID: Uuid = Uuid::from_u128(0x7a00_0000_0000_4000_8000_0000_0000_0001);
pub const ADMIN_ID: Uuid = Uuid::from_u128(0x7a00_0000_0000_4000_8000_0000_0000_0002);
pub const CUSTOMER_ID: Uuid = Uuid::from_u128(0x7a00_0000_0000_4000_8000_0000_0000_0003);
pub const OPERATOR_ID: Uuid = Uuid::from_u128(0x7a00_0000_0000_4000_8000_0000_0000_0004);
/// Assigned to [`CUSTOMER_ID`].
pub const PUMP_ID: Uuid = Uuid::from_u128(0x7a00_0000_0000_4000_8000_0000_0000_0010);
/// Not assigned to any customer.
pub const RESERVOIR_ID: Uuid = Uuid::from_u128(0x7a00_0000_0000_4000_8000_0000_0000_0011);

/// The platform's "no customer" id.
const NULL_ID: &str = "13814000-1dd2-11b2-8080-808080808080";

pub const PASSWORD: &str = "correct horse";

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// A platform-style access token. The signature is never checked by the
/// API, so any key will do.
pub fn token(authority: &str, user_id: Uuid, customer_id: Option<Uuid>, ttl_secs: i64) -> String {
    let claims = json!({
        "sub": format!("{user_id}@aquadash.test"),
        "userId": user_id,
        "scopes": [authority],
        "tenantId": TENANT_ID,
        "customerId": customer_id.map(|c| c.to_string()).unwrap_or_else(|| NULL_ID.to_string()),
        "iat": chrono::Utc::now().timestamp(),
        "exp": chrono::Utc::now().timestamp() + ttl_secs,
    });
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS512),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"platform-signing-key"),
    )
    .unwrap()
}

pub fn admin_token() -> String {
    token("TENANT_ADMIN", ADMIN_ID, None, 3600)
}

pub fn operator_token() -> String {
    token("CUSTOMER_USER", OPERATOR_ID, Some(CUSTOMER_ID), 3600)
}

// ---------------------------------------------------------------------------
// Stub Telemetry Platform
// ---------------------------------------------------------------------------

/// In-memory state behind the stub platform.
#[derive(Default)]
pub struct StubState {
    /// Server-scope attributes per user.
    pub attributes: HashMap<Uuid, Map<String, Value>>,
    /// `{key: [{ts, value}]}` per device.
    pub telemetry: HashMap<Uuid, BTreeMap<String, Vec<Value>>>,
    /// Devices whose telemetry reads answer 500.
    pub failing_devices: HashSet<Uuid>,
    /// Answer 401 to every authenticated call.
    pub reject_tokens: bool,
    pub attribute_writes: usize,
    pub saved_customers: Vec<Value>,
}

pub type SharedStub = Arc<Mutex<StubState>>;

pub struct StubPlatform {
    pub url: String,
    pub state: SharedStub,
}

impl StubPlatform {
    pub fn push_point(&self, device_id: Uuid, key: &str, ts: i64, value: Value) {
        self.state
            .lock()
            .unwrap()
            .telemetry
            .entry(device_id)
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push(json!({ "ts": ts, "value": value }));
    }
}

/// Start a stub platform on an ephemeral port.
pub async fn spawn_platform() -> StubPlatform {
    let state: SharedStub = Arc::default();
    let app = stub_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubPlatform {
        url: format!("http://{addr}"),
        state,
    }
}

fn stub_router(state: SharedStub) -> Router {
    Router::new()
        .route("/api/auth/login", routing::post(stub_login))
        .route("/api/auth/token", routing::post(stub_refresh))
        .route("/api/auth/user", routing::get(stub_current_user))
        .route("/api/customer", routing::post(stub_save_customer))
        .route("/api/tenant/devices", routing::get(stub_tenant_devices))
        .route("/api/customer/{id}/devices", routing::get(stub_customer_devices))
        .route(
            "/api/plugins/telemetry/DEVICE/{id}/keys/timeseries",
            routing::get(stub_telemetry_keys),
        )
        .route(
            "/api/plugins/telemetry/DEVICE/{id}/values/timeseries",
            routing::get(stub_read_telemetry),
        )
        .route(
            "/api/plugins/telemetry/DEVICE/{id}/timeseries/ANY",
            routing::post(stub_write_telemetry),
        )
        .route("/api/alarm/DEVICE/{id}", routing::get(stub_alarms))
        .route(
            "/api/plugins/telemetry/USER/{id}/values/attributes/SERVER_SCOPE",
            routing::get(stub_read_attributes),
        )
        .route(
            "/api/plugins/telemetry/USER/{id}/attributes/SERVER_SCOPE",
            routing::post(stub_write_attributes),
        )
        .with_state(state)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "status": 401, "message": "Token has expired", "errorCode": 11 })),
    )
        .into_response()
}

/// `Err` with a 401 response unless the call carries a token the stub accepts.
fn check_auth(state: &SharedStub, headers: &HeaderMap) -> Result<(), Response> {
    let bearer = headers
        .get("x-authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));
    if !bearer || state.lock().unwrap().reject_tokens {
        return Err(unauthorized());
    }
    Ok(())
}

fn page(data: Vec<Value>) -> Value {
    let total = data.len();
    json!({ "data": data, "totalPages": 1, "totalElements": total, "hasNext": false })
}

fn device(id: Uuid, name: &str, customer_id: Option<Uuid>) -> Value {
    json!({
        "id": { "id": id, "entityType": "DEVICE" },
        "name": name,
        "type": "sensor",
        "customerId": {
            "id": customer_id.map(|c| c.to_string()).unwrap_or_else(|| NULL_ID.to_string()),
            "entityType": "CUSTOMER"
        },
        "createdTime": 1_700_000_000_000_i64
    })
}

fn all_devices() -> Vec<Value> {
    vec![
        device(PUMP_ID, "Pump station 1", Some(CUSTOMER_ID)),
        device(RESERVOIR_ID, "Reservoir north", None),
    ]
}

async fn stub_login(Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": 401, "message": "Invalid username or password" })),
        )
            .into_response();
    }
    let token = if body["username"]
        .as_str()
        .is_some_and(|u| u.starts_with("operator"))
    {
        operator_token()
    } else {
        admin_token()
    };
    Json(json!({ "token": token, "refreshToken": "refresh-1" })).into_response()
}

async fn stub_refresh(Json(body): Json<Value>) -> Response {
    if body["refreshToken"] != "refresh-1" {
        return unauthorized();
    }
    Json(json!({ "token": admin_token(), "refreshToken": "refresh-2" })).into_response()
}

async fn stub_current_user(State(state): State<SharedStub>, headers: HeaderMap) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    Json(json!({
        "id": { "id": ADMIN_ID, "entityType": "USER" },
        "email": "admin@aquadash.test",
        "authority": "TENANT_ADMIN",
        "firstName": "Ada"
    }))
    .into_response()
}

async fn stub_save_customer(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    if body.get("id").is_none() {
        body["id"] = json!({ "id": Uuid::new_v4(), "entityType": "CUSTOMER" });
    }
    state.lock().unwrap().saved_customers.push(body.clone());
    Json(body).into_response()
}

async fn stub_tenant_devices(State(state): State<SharedStub>, headers: HeaderMap) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    Json(page(all_devices())).into_response()
}

async fn stub_customer_devices(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Path(customer_id): Path<Uuid>,
) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    let id = customer_id.to_string();
    let devices = all_devices()
        .into_iter()
        .filter(|d| d["customerId"]["id"] == id.as_str())
        .collect();
    Json(page(devices)).into_response()
}

async fn stub_telemetry_keys(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Path(device_id): Path<Uuid>,
) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    let keys: Vec<String> = state
        .lock()
        .unwrap()
        .telemetry
        .get(&device_id)
        .map(|series| series.keys().cloned().collect())
        .unwrap_or_default();
    Json(keys).into_response()
}

async fn stub_read_telemetry(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Path(device_id): Path<Uuid>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    let state = state.lock().unwrap();
    if state.failing_devices.contains(&device_id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "device actor crashed").into_response();
    }

    let range = match (query.get("startTs"), query.get("endTs")) {
        (Some(s), Some(e)) => Some((s.parse::<i64>().unwrap(), e.parse::<i64>().unwrap())),
        _ => None,
    };
    let keys = query.get("keys").cloned().unwrap_or_default();
    let stored = state.telemetry.get(&device_id);

    let mut out = Map::new();
    for key in keys.split(',').filter(|k| !k.is_empty()) {
        let Some(points) = stored.and_then(|s| s.get(key)) else {
            continue;
        };
        let mut points: Vec<Value> = match range {
            Some((start, end)) => points
                .iter()
                .filter(|p| {
                    let ts = p["ts"].as_i64().unwrap();
                    ts >= start && ts <= end
                })
                .cloned()
                .collect(),
            None => points
                .iter()
                .max_by_key(|p| p["ts"].as_i64().unwrap())
                .cloned()
                .into_iter()
                .collect(),
        };
        points.sort_by_key(|p| std::cmp::Reverse(p["ts"].as_i64().unwrap()));
        out.insert(key.to_string(), Value::Array(points));
    }
    Json(Value::Object(out)).into_response()
}

async fn stub_write_telemetry(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Path(device_id): Path<Uuid>,
    Json(values): Json<Map<String, Value>>,
) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    let ts = chrono::Utc::now().timestamp_millis();
    let mut state = state.lock().unwrap();
    let series = state.telemetry.entry(device_id).or_default();
    for (key, value) in values {
        series
            .entry(key)
            .or_default()
            .push(json!({ "ts": ts, "value": value }));
    }
    StatusCode::OK.into_response()
}

async fn stub_alarms(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Path(device_id): Path<Uuid>,
) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    let alarms = if device_id == PUMP_ID {
        vec![json!({
            "id": { "id": Uuid::new_v4(), "entityType": "ALARM" },
            "type": "High pressure",
            "severity": "CRITICAL",
            "status": "ACTIVE_UNACK",
            "startTs": 1_700_000_000_000_i64
        })]
    } else {
        Vec::new()
    };
    Json(page(alarms)).into_response()
}

async fn stub_read_attributes(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    let keys = query.get("keys").cloned().unwrap_or_default();
    let state = state.lock().unwrap();
    let stored = state.attributes.get(&user_id);
    let attributes: Vec<Value> = keys
        .split(',')
        .filter_map(|key| {
            stored
                .and_then(|s| s.get(key))
                .map(|value| json!({ "key": key, "value": value, "lastUpdateTs": 1 }))
        })
        .collect();
    Json(attributes).into_response()
}

async fn stub_write_attributes(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(values): Json<Map<String, Value>>,
) -> Response {
    if let Err(r) = check_auth(&state, &headers) {
        return r;
    }
    let mut state = state.lock().unwrap();
    state.attribute_writes += 1;
    state.attributes.entry(user_id).or_default().extend(values);
    StatusCode::OK.into_response()
}

// ---------------------------------------------------------------------------
// App under test
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` pointing at `platform_url`.
pub fn test_config(platform_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        platform_url: platform_url.to_string(),
        platform_timeout_secs: 5,
        dashboard_attribute_key: "dashboardConfig".to_string(),
    }
}

/// Build the full application router, with the production middleware stack,
/// talking to the platform at `platform_url`.
pub fn build_test_app(platform_url: &str) -> Router {
    let state = AppState::new(test_config(platform_url)).unwrap();
    build_app_router(state)
}

/// A stub platform plus an app wired to it.
pub async fn test_app() -> (Router, StubPlatform) {
    let platform = spawn_platform().await;
    let app = build_test_app(&platform.url);
    (app, platform)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
