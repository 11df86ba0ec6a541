mod support;

use infrarun_engine::{ExecutionEngine, Orchestrator, Plan, Run, RunObserver};
use infrarun_foundation::{Error, FailurePolicy};
use infrarun_report::Report;
use infrarun_tool::OutputStrategy;
use std::sync::{Arc, Mutex};
use support::{file_output, sarif_with, tool, FakeBackend, Script};
use tempfile::tempdir;

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        let mut events = self.events.lock().unwrap().clone();
        events.sort();
        events
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl RunObserver for RecordingObserver {
    fn on_preparation(&self, plan: &Plan) {
        self.push(format!("prepare:{}", plan.len()));
    }

    fn on_run_start(&self, run: &Run) {
        self.push(format!("start:{}", run.tool_name()));
    }

    fn on_run_parse(&self, run: &Run) {
        self.push(format!("parse:{}", run.tool_name()));
    }

    fn on_run_completion(&self, run: &Run, result: Result<&Report, &Error>) {
        let status = if result.is_ok() { "ok" } else { "err" };
        self.push(format!("done:{}:{}", run.tool_name(), status));
    }
}

fn two_tool_backend() -> FakeBackend {
    FakeBackend::new()
        .with_script(
            "good",
            Script::file("/out", "r.sarif", sarif_with("Good", "/src/a.tf", 1)),
        )
        .with_script("bad", Script::stdout("").exit_code(3))
}

fn two_tool_plan(target: &std::path::Path) -> Plan {
    let mut plan = Plan::new();
    plan.add_simple(
        &tool("good", "/src", file_output("/out", "r.sarif"), "sarif", &[]),
        target,
    )
    .unwrap();
    plan.add_simple(
        &tool("bad", "/src", OutputStrategy::Stdout, "glitch", &[]),
        target,
    )
    .unwrap();
    plan
}

#[tokio::test]
async fn test_partial_policy_merges_successful_runs() {
    let backend = Arc::new(two_tool_backend());
    let observer = Arc::new(RecordingObserver::default());
    let target = tempdir().unwrap();

    let outcome = Orchestrator::new(ExecutionEngine::new(backend.clone()))
        .with_observer(observer.clone())
        .execute(two_tool_plan(target.path()))
        .await
        .unwrap();

    assert_eq!(outcome.runs().len(), 2);
    assert_eq!(outcome.report.runs.len(), 1);
    assert_eq!(outcome.report.runs[0].tool.driver.name, "Good");

    let succeeded: Vec<_> = outcome.succeeded().map(|r| r.tool_name()).collect();
    assert_eq!(succeeded, vec!["good"]);

    let failed: Vec<_> = outcome.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0.tool_name(), "bad");
    assert!(matches!(
        failed[0].1.root(),
        Error::ContainerFailed { exit_code: 3, .. }
    ));

    // every run has exactly one outcome
    assert!(outcome.runs().iter().all(|r| r.outcome().is_some()));

    assert_eq!(
        observer.events(),
        vec![
            "done:bad:err",
            "done:good:ok",
            "parse:good",
            "prepare:2",
            "start:bad",
            "start:good",
        ]
    );
}

#[tokio::test]
async fn test_strict_policy_fails_after_every_run() {
    let backend = Arc::new(two_tool_backend());
    let target = tempdir().unwrap();

    let err = Orchestrator::new(ExecutionEngine::new(backend.clone()))
        .with_policy(FailurePolicy::Strict)
        .execute(two_tool_plan(target.path()))
        .await
        .unwrap_err();

    match err {
        Error::RunsFailed {
            failed,
            total,
            first,
        } => {
            assert_eq!((failed, total), (1, 2));
            assert!(first.contains("bad"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // the failing run did not stop the other one
    assert_eq!(backend.started_images(), vec!["bad", "good"]);
}

#[tokio::test]
async fn test_strict_policy_with_all_runs_passing() {
    let backend = Arc::new(FakeBackend::new().with_script(
        "good",
        Script::file("/out", "r.sarif", sarif_with("Good", "/src/a.tf", 1)),
    ));
    let target = tempdir().unwrap();

    let mut plan = Plan::new();
    plan.add_simple(
        &tool("good", "/src", file_output("/out", "r.sarif"), "sarif", &[]),
        target.path(),
    )
    .unwrap();

    let outcome = Orchestrator::new(ExecutionEngine::new(backend))
        .with_policy(FailurePolicy::Strict)
        .execute(plan)
        .await
        .unwrap();
    assert_eq!(outcome.report.runs.len(), 1);
}

#[tokio::test]
async fn test_parse_failure_excludes_run() {
    let backend = Arc::new(
        FakeBackend::new().with_script("broken", Script::file("/out", "r.sarif", "{not json")),
    );
    let target = tempdir().unwrap();

    let mut plan = Plan::new();
    plan.add_simple(
        &tool("broken", "/src", file_output("/out", "r.sarif"), "sarif", &[]),
        target.path(),
    )
    .unwrap();

    let outcome = Orchestrator::new(ExecutionEngine::new(backend.clone()))
        .execute(plan)
        .await
        .unwrap();

    assert!(outcome.report.runs.is_empty());
    let (_, err) = outcome.failed().next().unwrap();
    assert!(matches!(err, Error::Parse { .. }));
    assert!(backend.output_dirs().iter().all(|d| !d.exists()));
}

#[tokio::test]
async fn test_cancelling_one_run_leaves_others() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_script("slow", Script::hang())
            .with_script(
                "good",
                Script::file("/out", "r.sarif", sarif_with("Good", "/src/a.tf", 1)),
            ),
    );
    let target = tempdir().unwrap();

    let mut plan = Plan::new();
    let slow = plan
        .add_simple(
            &tool("slow", "/src", OutputStrategy::Stdout, "sarif", &[]),
            target.path(),
        )
        .unwrap();
    plan.add_simple(
        &tool("good", "/src", file_output("/out", "r.sarif"), "sarif", &[]),
        target.path(),
    )
    .unwrap();
    let slow_token = plan.get(slow).unwrap().cancel_token().clone();

    let orchestrator = Orchestrator::new(ExecutionEngine::new(backend.clone()));
    let (outcome, _) = tokio::join!(orchestrator.execute(plan), async {
        backend.hanging.notified().await;
        slow_token.cancel();
    });
    let outcome = outcome.unwrap();

    let failed: Vec<_> = outcome.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0.tool_name(), "slow");
    assert!(matches!(failed[0].1.root(), Error::Cancelled));

    assert_eq!(outcome.report.runs.len(), 1);
    assert!(!outcome.runs()[1].cancel_token().is_cancelled());
}

#[tokio::test]
async fn test_empty_plan() {
    let backend = Arc::new(FakeBackend::new());
    let outcome = Orchestrator::new(ExecutionEngine::new(backend))
        .with_policy(FailurePolicy::Strict)
        .execute(Plan::new())
        .await
        .unwrap();

    assert!(outcome.runs().is_empty());
    assert!(outcome.report.runs.is_empty());
}
