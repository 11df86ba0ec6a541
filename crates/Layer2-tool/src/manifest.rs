//! Declarative tool description, as written in tool definition files
//!
//! ```yaml
//! name: kics
//! image: checkmarx/kics:latest
//! cmd: ["scan", "-p", "/src", "-o", "/out", "--report-formats", "sarif"]
//! input_path: /src
//! output:
//!   type: file
//!   path: /out
//!   file: results.sarif
//! parser: kics
//! path_transformation:
//!   - pattern: "^/src/"
//!     replacement: ""
//! default_options: {}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named template values
pub type Parameters = BTreeMap<String, ParamValue>;

/// Value bound to a placeholder
///
/// Anything that is neither a string nor a list of strings is kept as
/// `Unsupported` and rejected when a template references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
    Unsupported(serde_json::Value),
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        ParamValue::List(items)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(items: Vec<&str>) -> Self {
        ParamValue::List(items.into_iter().map(String::from).collect())
    }
}

/// Where a tool leaves its output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputStrategy {
    /// Standard output, read back from the container logs
    Stdout,
    /// A file written into a directory the engine binds
    File {
        /// Directory inside the container
        path: String,
        /// File name inside `path`
        file: String,
    },
}

/// Serialized path rewrite rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRuleSpec {
    pub pattern: String,
    pub replacement: String,
}

fn default_exit_codes() -> Vec<i64> {
    vec![0]
}

/// Tool definition file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    pub name: String,
    pub image: String,
    pub cmd: Vec<String>,
    pub input_path: String,
    pub output: OutputStrategy,
    pub parser: String,

    #[serde(default)]
    pub path_transformation: Vec<PathRuleSpec>,

    #[serde(default)]
    pub default_options: Parameters,

    /// Exit codes that still count as a completed scan
    #[serde(default = "default_exit_codes")]
    pub success_exit_codes: Vec<i64>,
}

impl ToolManifest {
    pub fn from_yaml(content: &str) -> serde_yaml::Result<Self> {
        serde_yaml::from_str(content)
    }
}
