// src/config/mod.rs
//! Configuration loading. Only the binaries call into this module; the
//! pipeline receives an already resolved [`DigestConfig`].

pub mod digest;

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub use digest::{
    AiConfig, CalendarConfig, DigestConfig, EmailConfig, ReadingListConfig, RenderConfig,
    RetryConfig, WeatherConfig,
};

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/digest.toml";
pub const DEFAULT_JSON_PATH: &str = "config/digest.json";

/// Parse a config file (TOML or JSON, by extension) without resolving env.
pub fn load_from(path: &Path) -> Result<DigestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str()).with_context(|| format!("parsing {}", path.display()))
}

/// Locate the config file:
/// 1) $DIGEST_CONFIG_PATH
/// 2) config/digest.toml
/// 3) config/digest.json
///
/// Falls back to defaults when none exists.
pub fn locate_and_load() -> Result<DigestConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_from(&pb);
        }
    }
    tracing::info!(target: "digest", "no config file found, using defaults + environment");
    Ok(DigestConfig::default())
}

/// Load the config and resolve secrets from the process environment.
pub fn load_default() -> Result<DigestConfig> {
    let mut cfg = locate_and_load()?;
    cfg.resolve_env(|k| std::env::var(k).ok());
    Ok(cfg)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<DigestConfig> {
    match hint_ext {
        "json" => serde_json::from_str(s).map_err(anyhow::Error::from),
        "toml" => toml::from_str(s).map_err(anyhow::Error::from),
        _ => toml::from_str(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| serde_json::from_str(s).map_err(anyhow::Error::from))
            .map_err(|_| anyhow!("unsupported config format")),
    }
}
