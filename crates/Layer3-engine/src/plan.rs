//! Plan and Run
//!
//! A `Run` binds a resolved tool instance to a target directory. Its outcome
//! slot is written exactly once, by the task that executes it.

use infrarun_foundation::{Error, Result};
use infrarun_report::Report;
use infrarun_tool::{ParamValue, Parameters, ToolDefinition, ToolInstance};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Placeholder a Run's glob scope is offered under
pub const GLOB_PLACEHOLDER: &str = "glob";

/// Glob scope used when none is given
pub const DEFAULT_GLOB: &str = "**/*";

// ============================================================================
// RunId
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", &self.0.to_string()[..8])
    }
}

// ============================================================================
// Run
// ============================================================================

/// Result of executing a Run
#[derive(Debug)]
pub enum RunOutcome {
    /// Output obtained and parsed; `report` has host paths
    Completed { raw: Vec<u8>, report: Report },
    Failed(Error),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// One execution of a tool instance against a target directory
#[derive(Debug)]
pub struct Run {
    id: RunId,
    instance: ToolInstance,
    target: PathBuf,
    glob: String,
    cancel: CancellationToken,
    outcome: OnceLock<RunOutcome>,
}

impl Run {
    /// `target` is made absolute against the working directory and cleaned
    /// of `.` and `..` components
    pub fn new(instance: ToolInstance, target: impl AsRef<Path>, glob: impl Into<String>) -> Result<Self> {
        let target = target.as_ref();
        let target = if target.is_absolute() {
            normalize_path(target)
        } else {
            normalize_path(&std::env::current_dir()?.join(target))
        };

        Ok(Self {
            id: RunId::new(),
            instance,
            target,
            glob: glob.into(),
            cancel: CancellationToken::new(),
            outcome: OnceLock::new(),
        })
    }

    /// Replace the cancellation token, e.g. with a child of a wider scope
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn tool_name(&self) -> &str {
        self.instance.name()
    }

    pub fn instance(&self) -> &ToolInstance {
        &self.instance
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Abort this Run's in-flight backend calls; other Runs are unaffected
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.get()
    }

    pub fn report(&self) -> Option<&Report> {
        match self.outcome.get()? {
            RunOutcome::Completed { report, .. } => Some(report),
            RunOutcome::Failed(_) => None,
        }
    }

    pub fn raw_output(&self) -> Option<&[u8]> {
        match self.outcome.get()? {
            RunOutcome::Completed { raw, .. } => Some(raw),
            RunOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self.outcome.get()? {
            RunOutcome::Failed(e) => Some(e),
            RunOutcome::Completed { .. } => None,
        }
    }

    /// Store the outcome; returns `false` if one was already recorded
    pub(crate) fn record(&self, outcome: RunOutcome) -> bool {
        self.outcome.set(outcome).is_ok()
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Ordered Runs to execute together
#[derive(Debug, Default)]
pub struct Plan {
    runs: Vec<Arc<Run>>,
    parent: Option<CancellationToken>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs added from now on get child tokens of `parent`
    pub fn with_cancellation(parent: CancellationToken) -> Self {
        Self {
            runs: Vec::new(),
            parent: Some(parent),
        }
    }

    pub fn add_run(&mut self, run: Run) -> RunId {
        let run = match &self.parent {
            Some(parent) => run.with_cancel_token(parent.child_token()),
            None => run,
        };
        let id = run.id();
        self.runs.push(Arc::new(run));
        id
    }

    /// Resolve `definition` with `params` and add it as a Run
    ///
    /// The glob scope is offered as the `glob` placeholder unless `params` or
    /// the definition's defaults already bind it. Template errors surface
    /// here, before anything runs.
    pub fn add_tool(
        &mut self,
        definition: &ToolDefinition,
        params: &Parameters,
        target: impl AsRef<Path>,
        glob: &str,
    ) -> Result<RunId> {
        let instance = if params.contains_key(GLOB_PLACEHOLDER)
            || definition.default_options().contains_key(GLOB_PLACEHOLDER)
        {
            definition.to_instance(params)?
        } else {
            let mut params = params.clone();
            params.insert(GLOB_PLACEHOLDER.to_string(), ParamValue::from(glob));
            definition.to_instance(&params)?
        };

        Ok(self.add_run(Run::new(instance, target, glob)?))
    }

    /// `add_tool` with the definition's defaults and the default glob
    pub fn add_simple(&mut self, definition: &ToolDefinition, target: impl AsRef<Path>) -> Result<RunId> {
        self.add_tool(definition, &Parameters::new(), target, DEFAULT_GLOB)
    }

    pub fn runs(&self) -> &[Arc<Run>] {
        &self.runs
    }

    pub fn get(&self, id: RunId) -> Option<&Arc<Run>> {
        self.runs.iter().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub(crate) fn into_runs(self) -> Vec<Arc<Run>> {
        self.runs
    }
}

/// Lexically clean a path; `..` never climbs above the root
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            Component::CurDir => {}
            _ => components.push(component),
        }
    }

    components.iter().collect()
}
