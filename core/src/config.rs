//! Configuration: defaults, environment overrides and an optional TOML overlay.
//!
//! Precedence, lowest first: built-in defaults, environment variables, TOML
//! file (`SWITCHBOARD_CONFIG` or `./switchboard.toml`).

use crate::tools::native::{ModelCatalogConfig, ScreenshotConfig, WebSearchConfig};
use crate::{Result, SwitchboardError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_PATH_ENV: &str = "SWITCHBOARD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "switchboard.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchboardConfig {
    pub models: ModelCatalogConfig,
    pub screenshot: ScreenshotConfig,
    pub search: WebSearchConfig,
}

impl SwitchboardConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let num = |key: &str| var(key).and_then(|v| v.trim().parse::<u64>().ok());

        let mut cfg = Self::default();

        if let Some(url) = var("SWITCHBOARD_MODELS_URL") {
            cfg.models.base_url = url;
        }
        if let Some(key) = var("SWITCHBOARD_MODELS_API_KEY") {
            cfg.models.api_key = Some(key);
        }
        if let Some(ttl) = num("SWITCHBOARD_MODELS_CACHE_TTL_SECS") {
            cfg.models.cache_ttl_secs = ttl;
        }
        if let Some(url) = var("SCREENSHOT_API_URL") {
            cfg.screenshot.api_endpoint = url;
        }
        if let Some(key) = var("SCREENSHOT_API_KEY") {
            cfg.screenshot.api_key = Some(key);
        }
        if let Some(key) = var("BRAVE_API_KEY") {
            cfg.search.brave_api_key = Some(key);
        }
        if let Some(timeout_ms) = num("REQUEST_TIMEOUT_MS") {
            cfg.models.timeout_ms = timeout_ms;
            cfg.screenshot.timeout_ms = timeout_ms;
            cfg.search.timeout_ms = timeout_ms;
        }

        cfg
    }

    /// Overlays a TOML document onto `self`; keys absent from the document keep
    /// their current values
    pub fn overlay_toml(self, s: &str) -> Result<Self> {
        let overlay: toml::Value = toml::from_str(s)?;
        let mut base = toml::Value::try_from(&self)
            .map_err(|e| SwitchboardError::Config(format!("Failed to encode config: {}", e)))?;
        merge(&mut base, overlay);
        base.try_into().map_err(SwitchboardError::from)
    }

    /// Parses a standalone TOML document over built-in defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Self::default().overlay_toml(s)
    }

    /// Environment defaults overlaid with the TOML file at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_env().overlay_toml(&s)
    }

    /// Loads configuration, falling back to env defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        if !Path::new(&path).exists() {
            tracing::info!(target: "config", path = %path, "No TOML config found; using defaults/env");
            return Self::from_env();
        }
        match Self::from_file(&path) {
            Ok(cfg) => {
                tracing::info!(target: "config", path = %path, "Loaded TOML config");
                cfg
            }
            Err(e) => {
                tracing::warn!(target: "config", path = %path, error = %e, "Failed to load TOML; using defaults");
                Self::from_env()
            }
        }
    }
}

fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
