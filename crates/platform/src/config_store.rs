//! Persistence of the per-user dashboard configuration.
//!
//! The whole [`DashboardConfig`] is stored as one attribute value under a
//! well-known key. The attribute store has no version field, so
//! concurrent edits are detected here: the caller may pass the revision it
//! started from, and every write is read back and compared before the
//! stored value is handed back as the new source of truth.

use serde_json::Value;

use aquadash_core::dashboard::{check_consistency, prune_orphans, DashboardConfig};
use aquadash_core::error::CoreError;

use crate::attributes::AttributeStore;
use crate::error::PlatformError;
use crate::session::PlatformSession;

/// Attribute key used when none is configured.
pub const DEFAULT_CONFIG_KEY: &str = "dashboardConfig";

/// Dashboard config persistence over an [`AttributeStore`].
pub struct DashboardConfigStore<S> {
    store: S,
    key: String,
}

impl<S: AttributeStore> DashboardConfigStore<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// The user's stored config with orphans pruned, or an empty config if
    /// none was ever saved.
    pub async fn load(&self, session: &PlatformSession) -> Result<DashboardConfig, PlatformError> {
        let raw = self.store.read_attribute(session, &self.key).await?;
        let config = match raw {
            Some(value) => decode_config(value)?,
            None => DashboardConfig::default(),
        };
        Ok(prune_orphans(config))
    }

    /// Persist `config` and return what the store holds afterwards.
    ///
    /// Fails with [`CoreError::Conflict`] when `base_revision` no longer
    /// matches the stored config, or when the read-back differs from what
    /// was written (another writer got in between).
    pub async fn save(
        &self,
        session: &PlatformSession,
        config: DashboardConfig,
        base_revision: Option<&str>,
    ) -> Result<DashboardConfig, PlatformError> {
        check_consistency(&config)?;

        if let Some(expected) = base_revision {
            let current = self.load(session).await?;
            if current.revision() != expected {
                tracing::info!(
                    user_id = %session.user_id,
                    "Dashboard save rejected: stale base revision"
                );
                return Err(CoreError::Conflict(
                    "dashboard was changed by another session; reload and retry".to_string(),
                )
                .into());
            }
        }

        let value =
            serde_json::to_value(&config).map_err(|e| CoreError::Internal(e.to_string()))?;
        self.store.write_attribute(session, &self.key, value).await?;

        let stored = self.load(session).await?;
        if stored != config {
            tracing::warn!(
                user_id = %session.user_id,
                "Dashboard read-back differs from the written config"
            );
            return Err(CoreError::Conflict(
                "dashboard was overwritten during save; reload and retry".to_string(),
            )
            .into());
        }

        tracing::info!(
            user_id = %session.user_id,
            widgets = stored.widgets.len(),
            "Dashboard config saved"
        );
        Ok(stored)
    }
}

/// Decode a stored attribute value. Older writers stored the config as a
/// JSON string rather than an object; both forms are accepted.
fn decode_config(value: Value) -> Result<DashboardConfig, PlatformError> {
    let decoded = match value {
        Value::Null => return Ok(DashboardConfig::default()),
        Value::String(s) if s.trim().is_empty() => return Ok(DashboardConfig::default()),
        Value::String(s) => serde_json::from_str(&s),
        other => serde_json::from_value(other),
    };
    decoded.map_err(|e| PlatformError::Decode(format!("stored dashboard config: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
