//! Container backend trait

use crate::frame::demux_stdout;
use async_trait::async_trait;
use infrarun_foundation::Result;
use std::path::PathBuf;

/// Host directory bound into a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBind {
    /// Absolute host path
    pub host: PathBuf,
    /// Path inside the container
    pub guest: String,
}

impl VolumeBind {
    pub fn new(host: impl Into<PathBuf>, guest: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            guest: guest.into(),
        }
    }

    /// `host:guest` bind string
    pub fn to_bind_string(&self) -> String {
        format!("{}:{}", self.host.to_string_lossy(), self.guest)
    }
}

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub cmd: Vec<String>,
    pub binds: Vec<VolumeBind>,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>, cmd: Vec<String>) -> Self {
        Self {
            image: image.into(),
            cmd,
            binds: Vec::new(),
        }
    }

    pub fn with_bind(mut self, bind: VolumeBind) -> Self {
        self.binds.push(bind);
        self
    }
}

/// Container engine operations used by the execution engine
///
/// Implementations must be shareable across tasks; every call is independent.
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    /// Pull `image`, falling back to a local copy when the pull fails
    ///
    /// Fails with `Error::ImageUnavailable` when neither works.
    async fn ensure_image(&self, image: &str) -> Result<()>;

    /// Create, start and wait for a container until it is no longer running
    ///
    /// Returns the container id. A non-zero exit code is
    /// `Error::ContainerFailed`, which still carries the id so the caller can
    /// read whatever output the container left behind.
    async fn run_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Raw combined log stream of a finished container, framed
    async fn fetch_logs(&self, container_id: &str) -> Result<Vec<u8>>;

    /// Decoded standard output of a finished container
    async fn capture_stdout(&self, container_id: &str) -> Result<Vec<u8>> {
        let framed = self.fetch_logs(container_id).await?;
        Ok(demux_stdout(&framed)?)
    }

    /// Backend name
    fn name(&self) -> &'static str;
}
