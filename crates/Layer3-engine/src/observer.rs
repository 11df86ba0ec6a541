//! Run lifecycle observers
//!
//! Callbacks for different Runs fire concurrently from the tasks executing
//! them; implementations synchronize their own state.

use crate::plan::{Plan, Run};
use infrarun_foundation::Error;
use infrarun_report::Report;
use tracing::{debug, info, warn};

pub trait RunObserver: Send + Sync {
    /// Before any Run starts
    fn on_preparation(&self, _plan: &Plan) {}

    /// A Run's task has started
    fn on_run_start(&self, _run: &Run) {}

    /// Output obtained, parsing begins
    fn on_run_parse(&self, _run: &Run) {}

    /// The Run finished with a report or an error
    fn on_run_completion(&self, _run: &Run, _result: Result<&Report, &Error>) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Observer that reports every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_preparation(&self, plan: &Plan) {
        info!("Preparing {} runs", plan.len());
    }

    fn on_run_start(&self, run: &Run) {
        info!(
            "[{}] {} started on {}",
            run.id(),
            run.tool_name(),
            run.target().display()
        );
    }

    fn on_run_parse(&self, run: &Run) {
        debug!("[{}] {} parsing output", run.id(), run.tool_name());
    }

    fn on_run_completion(&self, run: &Run, result: Result<&Report, &Error>) {
        match result {
            Ok(report) => info!(
                "[{}] {} finished with {} findings",
                run.id(),
                run.tool_name(),
                report.finding_count()
            ),
            Err(e) => warn!("[{}] {} failed: {}", run.id(), run.tool_name(), e),
        }
    }
}
