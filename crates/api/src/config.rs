use anyhow::{bail, Context};
use axum::http::HeaderValue;

use aquadash_platform::config_store::DEFAULT_CONFIG_KEY;

/// Server configuration loaded from environment variables.
///
/// Everything except the platform URL has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Telemetry Platform base URL.
    pub platform_url: String,
    /// Per-call timeout toward the platform in seconds (default: `15`).
    pub platform_timeout_secs: u64,
    /// User attribute key holding the dashboard config blob.
    pub dashboard_attribute_key: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                       |
    /// | `PLATFORM_URL`            | **required**               |
    /// | `PLATFORM_TIMEOUT_SECS`   | `15`                       |
    /// | `DASHBOARD_ATTRIBUTE_KEY` | `dashboardConfig`          |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] but reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");

        let port: u16 = var("PORT", "3000")
            .parse()
            .context("PORT must be a valid u16")?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid CORS origin '{origin}'"))?;
        }

        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a valid u64")?;

        let platform_url = lookup("PLATFORM_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .context("PLATFORM_URL must be set")?;
        if !platform_url.starts_with("http://") && !platform_url.starts_with("https://") {
            bail!("PLATFORM_URL must be an http(s) URL, got '{platform_url}'");
        }

        let platform_timeout_secs: u64 = var("PLATFORM_TIMEOUT_SECS", "15")
            .parse()
            .context("PLATFORM_TIMEOUT_SECS must be a valid u64")?;

        let dashboard_attribute_key = var("DASHBOARD_ATTRIBUTE_KEY", DEFAULT_CONFIG_KEY);
        if dashboard_attribute_key.trim().is_empty() {
            bail!("DASHBOARD_ATTRIBUTE_KEY must not be empty");
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            platform_url,
            platform_timeout_secs,
            dashboard_attribute_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_platform_url_is_set() {
        let config = load(&[("PLATFORM_URL", "https://platform.example.org/")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.platform_url, "https://platform.example.org");
        assert_eq!(config.platform_timeout_secs, 15);
        assert_eq!(config.dashboard_attribute_key, "dashboardConfig");
    }

    #[test]
    fn platform_url_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("PLATFORM_URL"));
        assert!(load(&[("PLATFORM_URL", "ftp://platform")]).is_err());
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = load(&[("PLATFORM_URL", "http://p"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn cors_origins_are_split_and_checked() {
        let config = load(&[
            ("PLATFORM_URL", "http://p"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
        ])
        .unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);

        assert!(load(&[("PLATFORM_URL", "http://p"), ("CORS_ORIGINS", "http://bad\norigin")]).is_err());
    }
}
