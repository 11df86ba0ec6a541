//! # infrarun-engine
//!
//! Execution layer for Infrarun:
//! - `ExecutionEngine`: one tool instance → container → raw output bytes
//! - `Plan` / `Run`: what to execute, with write-once per-run outcomes
//! - `Orchestrator`: concurrent execution, merge, failure policy
//! - `RunObserver`: lifecycle callbacks (`NoopObserver`, `TracingObserver`)

pub mod executor;
pub mod observer;
pub mod orchestrator;
pub mod plan;

pub use executor::{ExecutionEngine, DEFAULT_TEMP_PREFIX};
pub use observer::{NoopObserver, RunObserver, TracingObserver};
pub use orchestrator::{Orchestrator, PlanOutcome};
pub use plan::{Plan, Run, RunId, RunOutcome, DEFAULT_GLOB, GLOB_PLACEHOLDER};
