//! Client configuration.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults (`http://localhost:8888`, 10 s timeout)
//! 2. TOML file (`--config`, or `<config_dir>/config.toml` when present)
//! 3. Environment: `CITYDASH_GATEWAY_URL`, `CITYDASH_TIMEOUT_SECS`

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Gateway address used when nothing else is configured.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8888";

/// Per-request timeout for gateway calls (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const ENV_GATEWAY_URL: &str = "CITYDASH_GATEWAY_URL";
const ENV_TIMEOUT_SECS: &str = "CITYDASH_TIMEOUT_SECS";

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the city API gateway.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Upper bound for any single gateway request.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Where the persisted session lives. Defaults to
    /// `<data_dir>/session.json`.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            request_timeout_secs: default_timeout_secs(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration: explicit file, else the default file if it
    /// exists, else defaults; then apply environment overrides and validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.normalize()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_GATEWAY_URL).filter(|v| !v.trim().is_empty()) {
            self.gateway_url = url.trim().to_string();
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds"))?;
        }
        Ok(())
    }

    /// Validate and canonicalize values.
    pub fn normalize(&mut self) -> Result<()> {
        let url = self.gateway_url.trim().trim_end_matches('/');
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("gateway_url must start with http:// or https:// (got '{url}')");
        }
        if url.starts_with("http://")
            && !(url.contains("://localhost") || url.contains("://127.0.0.1"))
        {
            tracing::warn!(
                gateway_url = url,
                "Gateway is not using HTTPS; credentials are sent in near-plaintext"
            );
        }
        self.gateway_url = url.to_string();

        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Session file path, falling back to the platform data directory.
    pub fn session_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join("session.json"))
            .context("Could not determine a data directory for the session file")
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "smartcity", "citydash")
}

/// `<config_dir>/config.toml` for this platform, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_local_gateway() {
        let config = ClientConfig::default();
        assert_eq!(config.gateway_url, "http://localhost:8888");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn toml_fields_are_optional() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config, ClientConfig::default());

        let config = ClientConfig::from_toml(
            r#"
            gateway_url = "https://city.example.org/"
            request_timeout_secs = 3
            session_file = "/tmp/citydash-session.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.request_timeout_secs, 3);
        assert_eq!(
            config.session_file().unwrap(),
            PathBuf::from("/tmp/citydash-session.json")
        );
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        assert!(ClientConfig::from_toml("gateway = \"http://x\"").is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = ClientConfig::default();
        config
            .apply_env_overrides(env(&[
                ("CITYDASH_GATEWAY_URL", "https://gw.example.org"),
                ("CITYDASH_TIMEOUT_SECS", "30"),
            ]))
            .unwrap();
        assert_eq!(config.gateway_url, "https://gw.example.org");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn invalid_timeout_env_is_an_error() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_env_overrides(env(&[("CITYDASH_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("CITYDASH_TIMEOUT_SECS"));
    }

    #[test]
    fn normalize_trims_trailing_slash_and_validates() {
        let mut config = ClientConfig {
            gateway_url: "http://localhost:8888///".into(),
            ..ClientConfig::default()
        };
        config.normalize().unwrap();
        assert_eq!(config.gateway_url, "http://localhost:8888");

        let mut bad_scheme = ClientConfig {
            gateway_url: "ftp://gateway".into(),
            ..ClientConfig::default()
        };
        assert!(bad_scheme.normalize().is_err());

        let mut zero_timeout = ClientConfig {
            request_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(zero_timeout.normalize().is_err());
    }

    #[test]
    fn from_file_reports_path_on_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = \"ten\"").unwrap();

        let err = ClientConfig::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }
}
