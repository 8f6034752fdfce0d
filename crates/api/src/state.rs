use std::sync::Arc;
use std::time::Duration;

use aquadash_platform::config_store::DashboardConfigStore;
use aquadash_platform::{PlatformClient, PlatformError};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Telemetry Platform client (shared connection pool).
    pub platform: PlatformClient,
    /// Per-user dashboard config persistence.
    pub dashboards: Arc<DashboardConfigStore<PlatformClient>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, PlatformError> {
        let platform = PlatformClient::new(
            config.platform_url.clone(),
            Duration::from_secs(config.platform_timeout_secs),
        )?;
        let dashboards = Arc::new(DashboardConfigStore::new(
            platform.clone(),
            config.dashboard_attribute_key.clone(),
        ));
        Ok(Self {
            config: Arc::new(config),
            platform,
            dashboards,
        })
    }
}
