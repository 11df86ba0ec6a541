//! Canonical report schema
//!
//! A subset of SARIF 2.1.0. Every object keeps the fields it does not model
//! in an `extra` map so a decoded report re-encodes without losing data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Schema URI stamped on every report this crate creates
pub const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";

/// Only supported version
pub const SARIF_VERSION: &str = "2.1.0";

/// Level given to findings that do not carry one
pub const DEFAULT_LEVEL: &str = "warning";

const LEVELS: &[&str] = &["none", "note", "warning", "error"];

// ============================================================================
// Report
// ============================================================================

/// Canonical report: a list of runs, one per tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    pub version: String,

    #[serde(default)]
    pub runs: Vec<ReportRun>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    /// Empty report with schema and version set
    pub fn new() -> Self {
        Self {
            schema: Some(SARIF_SCHEMA.to_string()),
            version: SARIF_VERSION.to_string(),
            runs: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Decode a report from JSON bytes
    pub fn from_slice(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn add_run(&mut self, run: ReportRun) {
        self.runs.push(run);
    }

    pub fn with_run(mut self, run: ReportRun) -> Self {
        self.runs.push(run);
        self
    }

    /// Total number of findings across runs
    pub fn finding_count(&self) -> usize {
        self.runs.iter().map(|r| r.results.len()).sum()
    }

    /// Concatenate the runs of `reports`, in input order
    ///
    /// Runs are not deduplicated or reordered.
    pub fn merge(reports: impl IntoIterator<Item = Report>) -> Report {
        let mut merged = Report::new();
        for report in reports {
            merged.runs.extend(report.runs);
        }
        merged
    }

    /// Check the structural rules every parser output must satisfy
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.version != SARIF_VERSION {
            return Err(format!(
                "unsupported version {:?}, expected {:?}",
                self.version, SARIF_VERSION
            ));
        }

        for (run_idx, run) in self.runs.iter().enumerate() {
            if run.tool.driver.name.is_empty() {
                return Err(format!("runs[{}]: driver name is empty", run_idx));
            }

            for (idx, finding) in run.results.iter().enumerate() {
                if finding.message.text.is_none() && !finding.message.extra.contains_key("id") {
                    return Err(format!(
                        "runs[{}].results[{}]: message has neither text nor id",
                        run_idx, idx
                    ));
                }
                if let Some(level) = &finding.level {
                    if !LEVELS.contains(&level.as_str()) {
                        return Err(format!(
                            "runs[{}].results[{}]: invalid level {:?}",
                            run_idx, idx, level
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Run
// ============================================================================

/// Output of one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRun {
    pub tool: ToolComponent,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub original_uri_base_ids: BTreeMap<String, ArtifactLocation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,

    #[serde(default)]
    pub results: Vec<Finding>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportRun {
    pub fn new(driver_name: impl Into<String>) -> Self {
        Self {
            tool: ToolComponent {
                driver: Driver::new(driver_name),
                extra: Map::new(),
            },
            original_uri_base_ids: BTreeMap::new(),
            artifacts: Vec::new(),
            results: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_information_uri(mut self, uri: impl Into<String>) -> Self {
        self.tool.driver.information_uri = Some(uri.into());
        self
    }

    /// Register an artifact once, returning its index
    pub fn add_distinct_artifact(&mut self, uri: &str) -> usize {
        if let Some(idx) = self
            .artifacts
            .iter()
            .position(|a| a.location.as_ref().and_then(|l| l.uri.as_deref()) == Some(uri))
        {
            return idx;
        }

        self.artifacts.push(Artifact {
            location: Some(ArtifactLocation::new(uri)),
            extra: Map::new(),
        });
        self.artifacts.len() - 1
    }

    /// Register a rule once; later descriptions for the same id are ignored
    pub fn add_rule(&mut self, id: &str, description: &str) -> usize {
        let rules = &mut self.tool.driver.rules;
        if let Some(idx) = rules.iter().position(|r| r.id == id) {
            return idx;
        }

        rules.push(Rule {
            id: id.to_string(),
            short_description: None,
            full_description: Some(Message::text(description)),
            extra: Map::new(),
        });
        rules.len() - 1
    }

    pub fn add_finding(&mut self, finding: Finding) {
        self.results.push(finding);
    }
}

/// `tool` object of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolComponent {
    pub driver: Driver,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Analysis tool description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Driver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: None,
            version: None,
            information_uri: None,
            rules: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Full name when present, short name otherwise
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<Message>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ArtifactLocation>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Findings
// ============================================================================

/// One reported issue (a SARIF `result`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(default)]
    pub message: Message,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_locations: Vec<Location>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<Fix>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Finding {
    pub fn new(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule_id: Some(rule_id.into()),
            level: None,
            message: Message::text(message),
            locations: Vec::new(),
            related_locations: Vec::new(),
            fixes: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    /// First location that names a file
    pub fn primary_location(&self) -> Option<&PhysicalLocation> {
        self.locations
            .iter()
            .filter_map(|l| l.physical_location.as_ref())
            .find(|p| p.uri().is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_location: Option<PhysicalLocation>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    /// File location covering lines `start_line..=end_line`
    pub fn file(uri: impl Into<String>, start_line: i64, end_line: i64) -> Self {
        Self {
            physical_location: Some(PhysicalLocation {
                artifact_location: Some(ArtifactLocation::new(uri)),
                region: Some(Region {
                    start_line: Some(start_line),
                    end_line: Some(end_line),
                    extra: Map::new(),
                }),
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_location: Option<ArtifactLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PhysicalLocation {
    pub fn uri(&self) -> Option<&str> {
        self.artifact_location.as_ref()?.uri.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_base_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArtifactLocation {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            uri_base_id: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Message>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifact_changes: Vec<ArtifactChange>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactChange {
    #[serde(default)]
    pub artifact_location: ArtifactLocation,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Tests
// ============================================================================
