//! `list` and `run` commands

use crate::output;
use anyhow::{anyhow, bail, Context};
use infrarun_container::DockerBackend;
use infrarun_engine::{ExecutionEngine, Orchestrator, Plan, TracingObserver};
use infrarun_foundation::{EngineConfig, FailurePolicy};
use infrarun_tool::{ParamValue, Parameters, ToolCatalog};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Report output format
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Canonical report as pretty JSON
    Json,
    /// One table per tool
    Table,
}

pub struct RunOptions {
    pub path: PathBuf,
    pub glob: Option<String>,
    pub overrides: Vec<String>,
    pub format: Format,
    pub strict: bool,
    pub tools: Vec<String>,
}

/// Print the catalog
pub fn list(catalog: &ToolCatalog, detailed: bool) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if catalog.is_empty() {
        writeln!(out, "No tools defined.")?;
        return Ok(());
    }

    for tool in catalog.iter() {
        if detailed {
            writeln!(
                out,
                "{}\n  image:  {}\n  parser: {}\n  output: {:?}",
                tool.name(),
                tool.image(),
                tool.parser().id(),
                tool.output()
            )?;
        } else {
            writeln!(out, "{}", tool.name())?;
        }
    }
    Ok(())
}

/// Build a Plan from the requested tools, execute it and print the report
pub async fn run(
    config: &EngineConfig,
    catalog: &ToolCatalog,
    options: RunOptions,
) -> anyhow::Result<()> {
    if !options.path.is_dir() {
        bail!("{} is not a directory", options.path.display());
    }

    let overrides = parse_overrides(&options.overrides)?;
    if let Some(tool) = overrides.keys().find(|t| !options.tools.contains(t)) {
        bail!("--set targets {:?}, which is not being run", tool);
    }

    let cancel = CancellationToken::new();
    let glob = options
        .glob
        .unwrap_or_else(|| config.engine.default_glob.clone());

    let mut plan = Plan::with_cancellation(cancel.clone());
    for name in &options.tools {
        let definition = catalog.get(name).ok_or_else(|| {
            anyhow!(
                "unknown tool {:?} (available: {})",
                name,
                catalog.names().join(", ")
            )
        })?;
        let params = overrides.get(name).cloned().unwrap_or_default();
        plan.add_tool(&definition, &params, &options.path, &glob)
            .with_context(|| format!("preparing {}", name))?;
    }

    let policy = if options.strict {
        FailurePolicy::Strict
    } else {
        config.engine.failure_policy
    };

    let backend = Arc::new(DockerBackend::from_settings(&config.docker)?);
    let orchestrator = Orchestrator::new(ExecutionEngine::from_settings(backend, &config.engine))
        .with_observer(Arc::new(TracingObserver))
        .with_policy(policy);

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling runs");
            interrupt.cancel();
        }
    });

    let outcome = orchestrator.execute(plan).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match options.format {
        Format::Json => writeln!(out, "{}", outcome.report.to_json_pretty()?)?,
        Format::Table => output::write_tables(&outcome.report, &mut out)?,
    }

    let failed = outcome.failed().count();
    if failed > 0 {
        warn!("{} of {} tools failed", failed, outcome.runs().len());
    }
    Ok(())
}

/// Parse `tool.key=value` overrides into per-tool parameters
///
/// A value written as a JSON array of strings becomes a list.
pub fn parse_overrides(items: &[String]) -> anyhow::Result<HashMap<String, Parameters>> {
    let mut overrides: HashMap<String, Parameters> = HashMap::new();

    for item in items {
        let (target, value) = item
            .split_once('=')
            .ok_or_else(|| anyhow!("expected TOOL.KEY=VALUE, got {:?}", item))?;
        let (tool, key) = target
            .split_once('.')
            .filter(|(tool, key)| !tool.is_empty() && !key.is_empty())
            .ok_or_else(|| anyhow!("expected TOOL.KEY=VALUE, got {:?}", item))?;

        let value = if value.trim_start().starts_with('[') {
            let items: Vec<String> = serde_json::from_str(value)
                .with_context(|| format!("{:?} is not a list of strings", value))?;
            ParamValue::List(items)
        } else {
            ParamValue::Text(value.to_string())
        };

        overrides
            .entry(tool.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    Ok(overrides)
}
