//! # infrarun-container
//!
//! Container backend for Infrarun:
//! - `ContainerBackend` trait: ensure image, run container, fetch logs
//! - `DockerBackend`: the trait over the Docker Engine API (bollard)
//! - `frame`: the 8-byte header log framing used by non-TTY containers

pub mod backend;
pub mod docker;
pub mod frame;

pub use backend::{ContainerBackend, ContainerSpec, VolumeBind};
pub use docker::DockerBackend;
pub use frame::{demux_stdout, encode_frame, FrameError, StreamType, FRAME_HEADER_LEN};
