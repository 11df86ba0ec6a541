//! # infrarun-foundation
//!
//! Foundation layer for Infrarun:
//! - Error: the error taxonomy shared by every layer
//! - Config: engine settings (Docker connection, temp dirs, failure policy)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  infrarun-cli                                           │
//! │                     │                                   │
//! │                     ▼                                   │
//! │  infrarun-engine (Execution Engine + Orchestrator)      │
//! │          ┌──────────┼──────────┐                        │
//! │          ▼          ▼          ▼                        │
//! │   container       tool  ──▶  report                     │
//! │          └──────────┴──────────┘                        │
//! │                     ▼                                   │
//! │             infrarun-foundation                         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, ExecutionPhase, Result, TemplateError};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    ConfigLoader, DockerSettings, EngineConfig, EngineSettings, FailurePolicy, CONFIG_DIR_NAME,
    CONFIG_FILE,
};
