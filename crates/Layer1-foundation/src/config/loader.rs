//! Configuration Loader
//!
//! ## Search order
//!
//! 1. User-level: `~/.infrarun/config.toml`
//! 2. Project-level: `.infrarun/config.toml`
//! 3. Environment: `INFRARUN_DOCKER_SOCKET`, `INFRARUN_TOOLS_DIR`
//!
//! Each level overrides the previous one key by key.

use super::engine::EngineConfig;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config directory name
pub const CONFIG_DIR_NAME: &str = ".infrarun";

/// Config file name
pub const CONFIG_FILE: &str = "config.toml";

pub const ENV_DOCKER_SOCKET: &str = "INFRARUN_DOCKER_SOCKET";
pub const ENV_TOOLS_DIR: &str = "INFRARUN_TOOLS_DIR";

// ============================================================================
// ConfigLoader
// ============================================================================

/// Layered config loader
pub struct ConfigLoader {
    /// Lowest priority first
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Default search paths for a working directory
    pub fn new(working_dir: &Path) -> Self {
        let mut search_paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            search_paths.push(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE));
        }
        search_paths.push(working_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE));

        Self { search_paths }
    }

    /// Custom search paths, lowest priority first
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths: paths,
        }
    }

    /// Load and merge every existing file, then apply environment overrides
    pub fn load_all(&self) -> Result<EngineConfig> {
        let mut config = self.load_files()?;
        apply_env(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load and merge every existing file
    pub fn load_files(&self) -> Result<EngineConfig> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        for path in &self.search_paths {
            if !path.exists() {
                debug!("No config at {}", path.display());
                continue;
            }

            let layer = read_layer(path)?;
            merge_values(&mut merged, layer);
            info!("Loaded config from {}", path.display());
        }

        merged
            .try_into::<EngineConfig>()
            .map_err(|e: toml::de::Error| Error::Config(e.to_string()))
    }
}

fn read_layer(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<toml::Value>()
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Deep-merge `overlay` into `base`; tables merge, everything else replaces
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply environment overrides through a lookup function
pub(crate) fn apply_env(config: &mut EngineConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(socket) = lookup(ENV_DOCKER_SOCKET).filter(|s| !s.is_empty()) {
        config.docker.socket = Some(socket);
    }
    if let Some(dir) = lookup(ENV_TOOLS_DIR).filter(|s| !s.is_empty()) {
        config.tools_dir = Some(PathBuf::from(dir));
    }
}

// ============================================================================
// Tests
// ============================================================================
