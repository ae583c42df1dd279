//! Configuration service.
//!
//! Loads [`ClientConfig`] from `config.toml` in the aura config directory and
//! applies environment overrides. A missing file yields the defaults; nothing
//! is created on disk.

use crate::paths::AuraPaths;
use aura_core::config::ClientConfig;
use aura_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Overrides `api_base_url`.
pub const ENV_API_URL: &str = "AURA_API_URL";
/// Overrides `log_level`.
pub const ENV_LOG_LEVEL: &str = "AURA_LOG_LEVEL";

/// Loads and caches the client configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService {
    /// Service reading the platform default `config.toml`.
    pub fn new() -> Self {
        Self {
            path: AuraPaths::config_file().ok(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Service reading an explicit file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the configuration, loading it on first access.
    ///
    /// A broken file is reported and replaced by defaults so the client can
    /// still start.
    pub fn get_config(&self) -> ClientConfig {
        if let Some(cached) = self
            .config
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
        {
            return cached.clone();
        }

        let loaded = match self.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[ConfigService] Falling back to defaults: {}", e);
                apply_env_overrides(ClientConfig::default(), |key| std::env::var(key).ok())
            }
        };
        *self.config.write().unwrap_or_else(|p| p.into_inner()) = Some(loaded.clone());
        loaded
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    /// Reads the file (if any) and applies environment overrides.
    pub fn load(&self) -> Result<ClientConfig> {
        let from_file = match &self.path {
            Some(path) => load_file(path)?,
            None => ClientConfig::default(),
        };
        Ok(apply_env_overrides(from_file, |key| std::env::var(key).ok()))
    }
}

fn load_file(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        tracing::debug!("[ConfigService] No config at {:?}, using defaults", path);
        return Ok(ClientConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    let config: ClientConfig = toml::from_str(&content)?;
    tracing::debug!("[ConfigService] Loaded config from {:?}", path);
    Ok(config)
}

/// Applies `AURA_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(mut config: ClientConfig, lookup: F) -> ClientConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        config.api_base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
        config.log_level = level.trim().to_string();
    }
    config
}
