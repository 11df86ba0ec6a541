//! Config - engine settings
//!
//! - `engine.rs` - EngineConfig and its sections
//! - `loader.rs` - layered TOML loading (user, then project) plus env overrides

mod engine;
mod loader;

pub use engine::{DockerSettings, EngineConfig, EngineSettings, FailurePolicy};
pub use loader::{ConfigLoader, CONFIG_DIR_NAME, CONFIG_FILE, ENV_DOCKER_SOCKET, ENV_TOOLS_DIR};
