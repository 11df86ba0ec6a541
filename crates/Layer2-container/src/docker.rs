//! Docker backend - runs tool containers through the Docker Engine API

use crate::backend::{ContainerBackend, ContainerSpec};
use crate::frame::{encode_frame, StreamType};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerWaitResponse, HostConfig};
use bollard::Docker;
use futures::{StreamExt, TryStreamExt};
use infrarun_foundation::{DockerSettings, Error, Result};
use std::future::Future;
use tracing::{debug, info, warn};

/// Docker backend
pub struct DockerBackend {
    docker: Docker,
}

impl DockerBackend {
    /// Connect using the local defaults (`DOCKER_HOST` or the default socket)
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(docker_error)?;
        Ok(Self { docker })
    }

    /// Connect according to settings
    pub fn from_settings(settings: &DockerSettings) -> Result<Self> {
        let docker = match &settings.socket {
            #[cfg(unix)]
            Some(socket) => Docker::connect_with_unix(
                socket,
                settings.timeout_secs,
                &bollard::API_DEFAULT_VERSION,
            )
            .map_err(docker_error)?,
            #[cfg(not(unix))]
            Some(socket) => {
                return Err(Error::Config(format!(
                    "unix socket {} is not supported on this platform",
                    socket
                )))
            }
            None => Docker::connect_with_local_defaults()
                .map_err(docker_error)?
                .with_timeout(settings.timeout()),
        };

        Ok(Self { docker })
    }

    /// Wrap an existing client
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }

    async fn pull(&self, image: &str) -> std::result::Result<(), BollardError> {
        let (from_image, tag) = split_image_ref(image);
        let options = CreateImageOptions {
            from_image,
            tag,
            ..Default::default()
        };

        // Progress messages are drained and dropped
        self.docker
            .create_image(Some(options), None, None)
            .try_for_each(|_| futures::future::ready(Ok(())))
            .await
    }
}

#[async_trait]
impl ContainerBackend for DockerBackend {
    async fn ensure_image(&self, image: &str) -> Result<()> {
        info!("Pulling image: {}", image);
        ensure_with(image, self.pull(image), || self.docker.inspect_image(image)).await
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<String> {
        let binds: Vec<String> = spec.binds.iter().map(|b| b.to_bind_string()).collect();

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.cmd.clone()),
            tty: Some(false),
            host_config: Some(HostConfig {
                binds: if binds.is_empty() { None } else { Some(binds) },
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| Error::Docker(format!("Failed to create container: {}", e)))?;
        let container_id = response.id;

        self.docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Error::Docker(format!("Failed to start container: {}", e)))?;

        debug!("Started container {} ({})", container_id, spec.image);

        let mut wait = Box::pin(self.docker.wait_container(
            &container_id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        ));

        let next = wait.next().await;
        drop(wait);

        let exit_code = exit_code(&container_id, next)?;
        info!("Container {} exited with code {}", container_id, exit_code);
        check_exit(container_id, exit_code)
    }

    async fn fetch_logs(&self, container_id: &str) -> Result<Vec<u8>> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: false,
            follow: false,
            tail: "all".to_string(),
            ..Default::default()
        };

        // bollard hands back parsed chunks; they are re-framed so every
        // backend yields the same wire shape
        let mut framed = Vec::new();
        let mut logs = Box::pin(self.docker.logs(container_id, Some(options)));

        while let Some(chunk) = logs.next().await {
            let chunk = chunk.map_err(|e| {
                Error::OutputRead(format!("Failed to read logs of {}: {}", container_id, e))
            })?;

            let (stream, message) = match chunk {
                LogOutput::StdOut { message } | LogOutput::Console { message } => {
                    (StreamType::Stdout, message)
                }
                LogOutput::StdErr { message } => (StreamType::Stderr, message),
                LogOutput::StdIn { message } => (StreamType::Stdin, message),
            };
            encode_frame(stream, &message, &mut framed);
        }

        debug!("Fetched {} log bytes from {}", framed.len(), container_id);
        Ok(framed)
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}

fn docker_error(e: BollardError) -> Error {
    Error::Docker(e.to_string())
}

/// Pull `image`; when the pull fails fall back to a local copy if `inspect`
/// finds one
async fn ensure_with<P, I, F, T>(image: &str, pull: P, inspect: I) -> Result<()>
where
    P: Future<Output = std::result::Result<(), BollardError>>,
    I: FnOnce() -> F,
    F: Future<Output = std::result::Result<T, BollardError>>,
{
    let pull_err = match pull.await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    match inspect().await {
        Ok(_) => {
            warn!("Pull of {} failed ({}), using local copy", image, pull_err);
            Ok(())
        }
        Err(_) => Err(Error::ImageUnavailable {
            image: image.to_string(),
            reason: pull_err.to_string(),
        }),
    }
}

/// Exit code from the first item of a wait stream
fn exit_code(
    container_id: &str,
    next: Option<std::result::Result<ContainerWaitResponse, BollardError>>,
) -> Result<i64> {
    match next {
        Some(Ok(status)) => Ok(status.status_code),
        // bollard reports non-zero exits as an error carrying the code
        Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
        Some(Err(e)) => Err(Error::Docker(format!(
            "Failed to wait for container {}: {}",
            container_id, e
        ))),
        None => Err(Error::Docker(format!(
            "Wait stream for container {} ended without a status",
            container_id
        ))),
    }
}

fn check_exit(container_id: String, exit_code: i64) -> Result<String> {
    if exit_code == 0 {
        Ok(container_id)
    } else {
        Err(Error::ContainerFailed {
            container_id,
            exit_code,
        })
    }
}

/// Split `name[:tag]` so a pull never asks for every tag of a repository
///
/// A colon that belongs to a registry port (`host:5000/img`) is not a tag
/// separator; digests (`img@sha256:...`) are passed through whole.
pub(crate) fn split_image_ref(image: &str) -> (&str, &str) {
    if image.contains('@') {
        return (image, "");
    }

    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_image_ref() {
        assert_eq!(
            split_image_ref("checkmarx/kics:latest"),
            ("checkmarx/kics", "latest")
        );
        assert_eq!(split_image_ref("alpine"), ("alpine", "latest"));
        assert_eq!(
            split_image_ref("registry.local:5000/tools/glitch"),
            ("registry.local:5000/tools/glitch", "latest")
        );
        assert_eq!(
            split_image_ref("registry.local:5000/tools/glitch:1.2"),
            ("registry.local:5000/tools/glitch", "1.2")
        );
        assert_eq!(
            split_image_ref("alpine@sha256:abcd"),
            ("alpine@sha256:abcd", "")
        );
    }

    fn server_error(message: &str) -> BollardError {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message: message.to_string(),
        }
    }

    fn waited(status_code: i64) -> Option<std::result::Result<ContainerWaitResponse, BollardError>> {
        Some(Ok(ContainerWaitResponse {
            status_code,
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_ensure_image_pull_ok_skips_inspect() {
        let inspected = std::cell::Cell::new(false);
        let result = ensure_with("alpine", async { Ok(()) }, || {
            inspected.set(true);
            async { Ok::<(), BollardError>(()) }
        })
        .await;
        assert!(result.is_ok());
        assert!(!inspected.get());
    }

    #[tokio::test]
    async fn test_ensure_image_falls_back_to_local_copy() {
        let result = ensure_with(
            "alpine",
            async { Err(server_error("registry unreachable")) },
            || async { Ok::<_, BollardError>("sha256:local") },
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_image_unavailable_without_local_copy() {
        let result = ensure_with(
            "alpine",
            async { Err(server_error("registry unreachable")) },
            || async { Err::<(), _>(server_error("no such image")) },
        )
        .await;

        match result {
            Err(Error::ImageUnavailable { image, reason }) => {
                assert_eq!(image, "alpine");
                assert!(reason.contains("registry unreachable"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_exit_code_from_wait_stream() {
        assert_eq!(exit_code("c1", waited(0)).unwrap(), 0);
        assert_eq!(exit_code("c1", waited(3)).unwrap(), 3);

        let wait_error = Some(Err(BollardError::DockerContainerWaitError {
            error: String::new(),
            code: 50,
        }));
        assert_eq!(exit_code("c1", wait_error).unwrap(), 50);

        assert!(matches!(
            exit_code("c1", Some(Err(server_error("gone")))),
            Err(Error::Docker(_))
        ));
        assert!(matches!(exit_code("c1", None), Err(Error::Docker(_))));
    }

    #[test]
    fn test_check_exit() {
        assert_eq!(check_exit("c1".to_string(), 0).unwrap(), "c1");
        match check_exit("c1".to_string(), 40) {
            Err(Error::ContainerFailed {
                container_id,
                exit_code,
            }) => {
                assert_eq!(container_id, "c1");
                assert_eq!(exit_code, 40);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
