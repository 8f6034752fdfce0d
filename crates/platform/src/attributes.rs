//! Per-user key/value attribute storage.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::PlatformClient;
use crate::error::PlatformError;
use crate::session::PlatformSession;

/// Attribute storage scoped to the session's user.
///
/// There is no versioning or transaction support behind this seam: a write
/// replaces the stored value and the last writer wins.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// The value under `key`, or `None` if it was never written.
    async fn read_attribute(
        &self,
        session: &PlatformSession,
        key: &str,
    ) -> Result<Option<Value>, PlatformError>;

    async fn write_attribute(
        &self,
        session: &PlatformSession,
        key: &str,
        value: Value,
    ) -> Result<(), PlatformError>;
}

#[async_trait]
impl AttributeStore for PlatformClient {
    async fn read_attribute(
        &self,
        session: &PlatformSession,
        key: &str,
    ) -> Result<Option<Value>, PlatformError> {
        let attributes = self
            .read_user_attributes(session, session.user_id, &[key])
            .await?;
        Ok(attributes
            .into_iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value))
    }

    async fn write_attribute(
        &self,
        session: &PlatformSession,
        key: &str,
        value: Value,
    ) -> Result<(), PlatformError> {
        let mut attributes = Map::new();
        attributes.insert(key.to_string(), value);
        self.write_user_attributes(session, session.user_id, &attributes)
            .await
    }
}
