//! Engine Config

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default location of tool definitions, relative to the working directory
pub const DEFAULT_TOOLS_DIR: &str = ".infrarun/tools";

// ============================================================================
// EngineConfig
// ============================================================================

/// Infrarun settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Container engine connection
    pub docker: DockerSettings,

    /// Execution settings
    pub engine: EngineSettings,

    /// Directory holding tool definition files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tool definition directory, falling back to `.infrarun/tools`
    pub fn tools_dir(&self) -> PathBuf {
        self.tools_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOOLS_DIR))
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Docker connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerSettings {
    /// Unix socket path; `None` uses the local defaults (honours `DOCKER_HOST`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            socket: None,
            timeout_secs: 120,
        }
    }
}

impl DockerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Prefix for per-run temporary output directories
    pub temp_prefix: String,

    /// Glob scope given to runs that do not set one
    pub default_glob: String,

    /// What a failed run does to the whole plan
    pub failure_policy: FailurePolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            temp_prefix: "infrarun-".to_string(),
            default_glob: "**/*".to_string(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// How per-run failures affect an orchestration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Failed runs are left out of the merged report
    #[default]
    Partial,

    /// Any failed run fails the whole plan, after every run has finished
    Strict,
}
