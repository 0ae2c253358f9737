use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::request::{RequestDefaults, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::retry::{Backoff, RetryPolicy};
use crate::transport::DEFAULT_API_VERSION;

/// Environment variable consulted when the config carries no key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Backoff parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// One backoff unit in milliseconds; exponential waits are 2^attempt units.
    pub unit_ms: u64,
    /// Wait before draining again after a drain was rate limited without a
    /// `retry-after` hint.
    pub rate_limit_cooldown_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            unit_ms: 1000,
            rate_limit_cooldown_secs: 60,
        }
    }
}

/// Transport timeouts (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Whole-request timeout; long generations need a generous value.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 600,
        }
    }
}

/// Configuration loaded from `~/.config/gencall/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GencallConfig {
    /// API key; when absent, `ANTHROPIC_API_KEY` is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub api_version: String,
    /// Default model for requests that do not name one.
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Total attempts per request (0 behaves like 1).
    pub max_retries: u32,
    /// Optional backoff tuning; if missing, built-in defaults are used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffConfig>,
    /// Optional timeouts; if missing, built-in defaults are used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpConfig>,
}

impl Default for GencallConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com/".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            max_retries: 3,
            backoff: None,
            http: None,
        }
    }
}

impl GencallConfig {
    /// API key from the config, else from `ANTHROPIC_API_KEY`.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(std::env::var(API_KEY_ENV).ok())
    }

    fn resolve_api_key_with(&self, env_value: Option<String>) -> Result<String> {
        let from_cfg = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        if let Some(key) = from_cfg {
            return Ok(key.to_string());
        }
        match env_value.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => bail!("API key must be set in the config file or the {API_KEY_ENV} environment variable"),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = self.backoff.clone().unwrap_or_default();
        RetryPolicy::new(
            self.max_retries,
            Backoff::new(Duration::from_millis(backoff.unit_ms)),
        )
    }

    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("gencall")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GencallConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = GencallConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<GencallConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let cfg: GencallConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
