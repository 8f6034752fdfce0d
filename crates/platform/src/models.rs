//! Wire shapes of the Telemetry Platform's registry entities.
//!
//! Only the fields the dashboard reads are typed; everything else is kept
//! in `extra` so that proxied entities round-trip without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use aquadash_core::error::CoreError;
use aquadash_core::types::{EntityUuid, EpochMillis};

/// Default page size for registry listings.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Largest page size the proxy will forward.
pub const MAX_PAGE_SIZE: u32 = 1000;

// ---------------------------------------------------------------------------
// Ids and paging
// ---------------------------------------------------------------------------

/// Typed entity reference, e.g. `{"id": "...", "entityType": "DEVICE"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityId {
    pub id: EntityUuid,
    pub entity_type: String,
}

impl EntityId {
    pub fn new(entity_type: &str, id: EntityUuid) -> Self {
        Self {
            id,
            entity_type: entity_type.to_string(),
        }
    }
}

/// One page of a registry listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total_pages: i64,
    #[serde(default)]
    pub total_elements: i64,
    #[serde(default)]
    pub has_next: bool,
}

/// Paging parameters, `?pageSize=&page=` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub page: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageLink {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page: 0,
        }
    }
}

impl PageLink {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(CoreError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }

    pub fn query(&self) -> [(&'static str, String); 2] {
        [
            ("pageSize", self.page_size.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// ---------------------------------------------------------------------------
// Registry entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub email: String,
    pub authority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<EntityId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<EntityId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(rename = "type")]
    pub alarm_type: String,
    pub severity: String,
    pub status: String,
    #[serde(default)]
    pub start_ts: EpochMillis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ts: Option<EpochMillis>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entity attribute as returned by the attribute read endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeKv {
    pub key: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_ts: Option<EpochMillis>,
}

/// The platform encodes "no customer" as this id rather than omitting it.
pub const NULL_ENTITY_UUID: Uuid = Uuid::from_u128(0x13814000_1dd2_11b2_8080_808080808080);

/// `None` for absent ids and for the platform's null-entity id.
pub fn non_null_id(id: Option<EntityUuid>) -> Option<EntityUuid> {
    id.filter(|id| *id != NULL_ENTITY_UUID)
}
