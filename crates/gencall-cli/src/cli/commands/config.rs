//! `gencall config` – where the config lives and what it resolves to.

use anyhow::Result;
use gencall_core::config::{GencallConfig, API_KEY_ENV};
use std::path::Path;

/// Where the API key comes from, never the key itself.
fn api_key_source(cfg: &GencallConfig) -> String {
    match cfg.api_key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => "set in config file".to_string(),
        _ => match cfg.resolve_api_key() {
            Ok(_) => format!("from {}", API_KEY_ENV),
            Err(_) => "missing".to_string(),
        },
    }
}

pub fn run_config(cfg: &GencallConfig, path: &Path) -> Result<()> {
    let policy = cfg.retry_policy();
    println!("config file:  {}", path.display());
    println!("api key:      {}", api_key_source(cfg));
    println!("base url:     {}", cfg.base_url);
    println!("api version:  {}", cfg.api_version);
    println!("model:        {}", cfg.model);
    println!("max tokens:   {}", cfg.max_tokens);
    println!("temperature:  {}", cfg.temperature);
    println!("max retries:  {}", policy.attempts());
    println!("backoff unit: {:?}", policy.backoff.unit);
    let backoff = cfg.backoff.clone().unwrap_or_default();
    println!("rate-limit cooldown: {}s", backoff.rate_limit_cooldown_secs);
    let http = cfg.http.clone().unwrap_or_default();
    println!(
        "http timeouts: connect {}s, total {}s",
        http.connect_timeout_secs, http.timeout_secs
    );
    Ok(())
}
