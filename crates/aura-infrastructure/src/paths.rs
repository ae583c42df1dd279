//! Platform paths for aura's configuration and session files.
//!
//! ```text
//! ~/.config/aura/          # Config directory (platform default)
//! ├── config.toml          # Client configuration
//! └── session.json         # Durable session tier
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// No platform config directory could be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find a config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for aura_core::AuraError {
    fn from(err: PathError) -> Self {
        aura_core::AuraError::config(err.to_string())
    }
}

/// Path resolution for aura.
///
/// `AURA_CONFIG_DIR` overrides the platform directory, which keeps tests and
/// multiple profiles apart.
pub struct AuraPaths;

impl AuraPaths {
    const APP_DIR: &'static str = "aura";

    /// Returns the aura configuration directory.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        if let Ok(dir) = std::env::var("AURA_CONFIG_DIR")
            && !dir.trim().is_empty()
        {
            return Ok(PathBuf::from(dir));
        }
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Durable session storage ("remember me" tier).
    pub fn session_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("session.json"))
    }
}
