//! Orchestrator - executes every Run of a Plan concurrently
//!
//! ## Flow
//!
//! ```text
//! on_preparation ─▶ spawn one task per Run ─▶ barrier ─▶ merge succeeded
//!                     │                                     │
//!                     ├ on_run_start                        ▼
//!                     ├ engine.execute                 FailurePolicy
//!                     ├ on_run_parse / normalize
//!                     └ on_run_completion
//! ```
//!
//! A failed Run never cancels its siblings; every Run runs to completion
//! before the policy is applied.

use crate::executor::ExecutionEngine;
use crate::observer::{NoopObserver, RunObserver};
use crate::plan::{Plan, Run, RunOutcome};
use infrarun_foundation::{Error, FailurePolicy, Result};
use infrarun_report::Report;
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// PlanOutcome
// ============================================================================

/// Runs of an executed Plan and the merged report of the ones that succeeded
#[derive(Debug)]
pub struct PlanOutcome {
    pub report: Report,
    runs: Vec<Arc<Run>>,
}

impl PlanOutcome {
    fn new(runs: Vec<Arc<Run>>) -> Self {
        let report = Report::merge(runs.iter().filter_map(|run| run.report().cloned()));
        Self { report, runs }
    }

    /// Every Run, in Plan order
    pub fn runs(&self) -> &[Arc<Run>] {
        &self.runs
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &Run> {
        self.runs
            .iter()
            .map(|run| run.as_ref())
            .filter(|run| run.report().is_some())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Run, &Error)> {
        self.runs
            .iter()
            .filter_map(|run| run.error().map(|e| (run.as_ref(), e)))
    }

    pub fn into_report(self) -> Report {
        self.report
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    engine: Arc<ExecutionEngine>,
    observer: Arc<dyn RunObserver>,
    policy: FailurePolicy,
}

impl Orchestrator {
    pub fn new(engine: ExecutionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            observer: Arc::new(NoopObserver),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Execute every Run and wait for all of them
    ///
    /// Under `Partial` the merged report holds the succeeded Runs and failed
    /// ones are only recorded. Under `Strict` any failure turns the whole
    /// Plan into `Error::RunsFailed`, after every Run has finished.
    pub async fn execute(&self, plan: Plan) -> Result<PlanOutcome> {
        self.observer.on_preparation(&plan);

        let runs = plan.into_runs();
        let handles: Vec<_> = runs
            .iter()
            .map(|run| {
                let run = Arc::clone(run);
                let engine = Arc::clone(&self.engine);
                let observer = Arc::clone(&self.observer);
                tokio::spawn(async move { execute_run(&engine, observer.as_ref(), &run).await })
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        for (run, result) in runs.iter().zip(joined) {
            if let Err(e) = result {
                error!("[{}] {} task aborted: {}", run.id(), run.tool_name(), e);
                run.record(RunOutcome::Failed(Error::Internal(format!(
                    "run task aborted: {}",
                    e
                ))));
            }
        }

        let outcome = PlanOutcome::new(runs);
        let total = outcome.runs().len();
        let failed = outcome.failed().count();
        info!(
            "Plan finished: {} of {} runs succeeded, {} findings",
            total - failed,
            total,
            outcome.report.finding_count()
        );

        if self.policy == FailurePolicy::Strict && failed > 0 {
            let first = outcome
                .failed()
                .next()
                .map(|(run, e)| describe_failure(run, e))
                .unwrap_or_default();
            return Err(Error::RunsFailed {
                failed,
                total,
                first,
            });
        }

        Ok(outcome)
    }
}

async fn execute_run(engine: &ExecutionEngine, observer: &dyn RunObserver, run: &Run) {
    observer.on_run_start(run);

    let outcome = match engine
        .execute(run.instance(), run.target(), run.cancel_token())
        .await
    {
        Ok(raw) => {
            observer.on_run_parse(run);
            match run.instance().normalize(&raw) {
                Ok(report) => RunOutcome::Completed { raw, report },
                Err(e) => RunOutcome::Failed(e),
            }
        }
        Err(e) => RunOutcome::Failed(e),
    };

    if !run.record(outcome) {
        warn!("[{}] outcome already recorded", run.id());
    }

    match run.outcome() {
        Some(RunOutcome::Completed { report, .. }) => observer.on_run_completion(run, Ok(report)),
        Some(RunOutcome::Failed(e)) => observer.on_run_completion(run, Err(e)),
        None => {}
    }
}

fn describe_failure(run: &Run, error: &Error) -> String {
    // phase errors already name the tool
    if error.phase().is_some() {
        error.to_string()
    } else {
        format!("{}: {}", run.tool_name(), error)
    }
}
