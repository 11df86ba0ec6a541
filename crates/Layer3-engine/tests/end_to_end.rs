//! Two heterogeneous tools against one directory, merged into one report

mod support;

use infrarun_engine::{ExecutionEngine, Orchestrator, Plan, TracingObserver};
use infrarun_report::ReportRun;
use infrarun_tool::OutputStrategy;
use std::sync::Arc;
use support::{file_output, tool, FakeBackend, Script};
use tempfile::tempdir;

const TOOL_A_SARIF: &str = r#"{
  "version": "2.1.0",
  "runs": [{
    "tool": {"driver": {"name": "ToolA", "version": "1.4.0"}},
    "artifacts": [{"location": {"uri": "file:///src/main.tf"}}],
    "results": [
      {
        "ruleId": "A001",
        "level": "error",
        "message": {"text": "bucket is public"},
        "locations": [{"physicalLocation": {
          "artifactLocation": {"uri": "file:///src/main.tf"},
          "region": {"startLine": 12, "endLine": 14}
        }}]
      },
      {
        "ruleId": "A002",
        "level": "note",
        "message": {"text": "missing tag"},
        "locations": [{"physicalLocation": {
          "artifactLocation": {"uri": "/src/modules/net.tf"},
          "region": {"startLine": 3}
        }}],
        "relatedLocations": [{"physicalLocation": {
          "artifactLocation": {"uri": "file:///src/variables.tf"}
        }}]
      }
    ]
  }]
}"#;

const TOOL_B_OUTPUT: &str = "\
Hard-coded secret,/glitch/main.tf,7,sec_hard_secr,password = \"hunter2\",n
this line is not a finding
Admin by default,/glitch/users.tf,not-a-number,sec_def_admin,user = root,n
Weak crypto,/glitch/modules/net.tf,21,sec_weak_crypt,md5(x),n
";

fn uris(run: &ReportRun) -> Vec<String> {
    run.results
        .iter()
        .flat_map(|r| r.locations.iter().chain(r.related_locations.iter()))
        .filter_map(|l| l.physical_location.as_ref()?.uri().map(String::from))
        .collect()
}

#[tokio::test]
async fn test_two_tools_merge_with_rewritten_paths() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_script("tool-a", Script::file("/out", "report.sarif", TOOL_A_SARIF))
            .with_script(
                "tool-b",
                Script::stdout(TOOL_B_OUTPUT).with_stderr("scanning 3 files"),
            ),
    );
    let target = tempdir().unwrap();

    let tool_a = tool(
        "tool-a",
        "/src",
        file_output("/out", "report.sarif"),
        "sarif",
        &[("^/src/", "")],
    );
    let tool_b = tool(
        "tool-b",
        "/glitch",
        OutputStrategy::Stdout,
        "glitch",
        &[("^/glitch/", "")],
    );

    let mut plan = Plan::new();
    plan.add_simple(&tool_a, target.path()).unwrap();
    plan.add_simple(&tool_b, target.path()).unwrap();

    let outcome = Orchestrator::new(ExecutionEngine::new(backend.clone()))
        .with_observer(Arc::new(TracingObserver))
        .execute(plan)
        .await
        .unwrap();

    assert_eq!(outcome.failed().count(), 0);
    let report = &outcome.report;
    assert_eq!(report.runs.len(), 2);

    let run_a = &report.runs[0];
    assert_eq!(run_a.tool.driver.name, "ToolA");
    assert_eq!(run_a.results.len(), 2);
    assert_eq!(
        uris(run_a),
        vec!["main.tf", "modules/net.tf", "variables.tf"]
    );
    assert_eq!(
        run_a.artifacts[0].location.as_ref().unwrap().uri.as_deref(),
        Some("main.tf")
    );

    let run_b = &report.runs[1];
    assert_eq!(run_b.tool.driver.name, "GLITCH");
    assert_eq!(run_b.results.len(), 2);
    assert_eq!(uris(run_b), vec!["main.tf", "modules/net.tf"]);

    // nothing still points inside a container
    for run in &report.runs {
        for uri in uris(run) {
            assert!(!uri.contains("/src/") && !uri.contains("/glitch/"), "{uri}");
        }
    }

    // both containers saw the host directory at their input path
    for spec in backend.specs() {
        assert_eq!(spec.binds[0].host, target.path());
    }
    assert!(backend.output_dirs().iter().all(|d| !d.exists()));

    let rows = run_b.rows();
    assert_eq!(rows[0].file, "main.tf");
    assert_eq!(rows[0].start_line, 7);
    assert_eq!(rows[0].end_line_display(), "7");
}
