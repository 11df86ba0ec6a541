//! Execution Engine - runs one tool instance in a container and returns its
//! raw output

use infrarun_container::{ContainerBackend, ContainerSpec, VolumeBind};
use infrarun_foundation::{EngineSettings, Error, ExecutionPhase, Result};
use infrarun_tool::{OutputStrategy, ToolInstance};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Prefix of per-run output directories when none is configured
pub const DEFAULT_TEMP_PREFIX: &str = "infrarun-";

/// Runs tool instances through a container backend
pub struct ExecutionEngine {
    backend: Arc<dyn ContainerBackend>,
    temp_prefix: String,
}

impl ExecutionEngine {
    pub fn new(backend: Arc<dyn ContainerBackend>) -> Self {
        Self {
            backend,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
        }
    }

    pub fn from_settings(backend: Arc<dyn ContainerBackend>, settings: &EngineSettings) -> Self {
        Self::new(backend).with_temp_prefix(settings.temp_prefix.clone())
    }

    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    pub fn backend(&self) -> &Arc<dyn ContainerBackend> {
        &self.backend
    }

    /// Run `instance` against `target` and return the raw tool output
    ///
    /// `target` is bound to the instance's input path. File output goes
    /// through a temporary directory that is removed on every exit path.
    /// Errors are tagged with the phase that failed.
    pub async fn execute(
        &self,
        instance: &ToolInstance,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let tool = instance.name();

        cancellable(cancel, self.backend.ensure_image(instance.image()))
            .await
            .map_err(|e| e.in_phase(tool, ExecutionPhase::Image))?;

        let mut spec = ContainerSpec::new(instance.image(), instance.cmd().to_vec())
            .with_bind(VolumeBind::new(target, instance.input_path()));

        // Held until the end of this function; dropping it removes the directory
        let output_dir = match instance.output() {
            OutputStrategy::File { path, file } => {
                let dir = self
                    .output_dir()
                    .map_err(|e| e.in_phase(tool, ExecutionPhase::Output))?;
                spec = spec.with_bind(VolumeBind::new(dir.path(), path.as_str()));
                Some((dir, file.as_str()))
            }
            OutputStrategy::Stdout => None,
        };

        let container_id = match cancellable(cancel, self.backend.run_container(&spec)).await {
            Ok(id) => id,
            Err(Error::ContainerFailed {
                container_id,
                exit_code,
            }) if instance.accepts_exit_code(exit_code) => {
                info!("{}: exit code {} accepted as a completed scan", tool, exit_code);
                container_id
            }
            Err(e) => return Err(e.in_phase(tool, ExecutionPhase::Run)),
        };

        let raw = match &output_dir {
            Some((dir, file)) => {
                let path = dir.path().join(file);
                tokio::fs::read(&path).await.map_err(|e| {
                    Error::OutputRead(format!("{}: {}", path.display(), e))
                        .in_phase(tool, ExecutionPhase::Output)
                })?
            }
            None => cancellable(cancel, self.backend.capture_stdout(&container_id))
                .await
                .map_err(|e| e.in_phase(tool, ExecutionPhase::Output))?,
        };

        debug!("{}: read {} bytes of output", tool, raw.len());
        Ok(raw)
    }

    fn output_dir(&self) -> Result<TempDir> {
        let dir = tempfile::Builder::new()
            .prefix(&self.temp_prefix)
            .tempdir()?;

        // The container user is usually not the host user
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o777))
            {
                warn!("Could not open up {}: {}", dir.path().display(), e);
            }
        }

        debug!("Created output directory {}", dir.path().display());
        Ok(dir)
    }
}

/// Race `fut` against `token`
async fn cancellable<T>(
    token: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result = cancellable(&token, async { Ok(1) }).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellable_passes_result_through() {
        let token = CancellationToken::new();
        assert_eq!(cancellable(&token, async { Ok(7) }).await.unwrap(), 7);
    }
}
