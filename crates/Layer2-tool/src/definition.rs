//! Compiled tool definitions and resolved instances

use crate::manifest::{OutputStrategy, Parameters, ToolManifest};
use crate::template;
use infrarun_foundation::{Error, Result};
use infrarun_report::{Parser, ParserRegistry, PathTransformation, PathTransformations, Report};
use tracing::debug;

// ============================================================================
// ToolDefinition
// ============================================================================

/// A tool definition with its parser resolved and its path rules compiled
///
/// Immutable once compiled.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    name: String,
    image: String,
    cmd: Vec<String>,
    input_path: String,
    output: OutputStrategy,
    parser: Parser,
    path_transformations: PathTransformations,
    default_options: Parameters,
    success_exit_codes: Vec<i64>,
}

impl ToolDefinition {
    /// Validate a manifest against the parser registry
    ///
    /// Unknown parsers and invalid path rules fail here, before anything runs.
    pub fn compile(manifest: ToolManifest, parsers: &ParserRegistry) -> Result<Self> {
        if manifest.name.trim().is_empty() {
            return Err(Error::Config("tool name is empty".to_string()));
        }
        if manifest.image.trim().is_empty() {
            return Err(Error::Config(format!("{}: image is empty", manifest.name)));
        }
        if !manifest.input_path.starts_with('/') {
            return Err(Error::Config(format!(
                "{}: input_path {:?} is not absolute",
                manifest.name, manifest.input_path
            )));
        }
        if let OutputStrategy::File { path, file } = &manifest.output {
            if !path.starts_with('/') || file.is_empty() {
                return Err(Error::Config(format!(
                    "{}: file output needs an absolute path and a file name",
                    manifest.name
                )));
            }
        }

        let parser = parsers.get(&manifest.parser)?;

        let rules = manifest
            .path_transformation
            .iter()
            .map(|rule| PathTransformation::new(&rule.pattern, rule.replacement.clone()))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Compiled tool {} (parser {}, {} path rules)",
            manifest.name,
            parser.id(),
            rules.len()
        );

        Ok(Self {
            name: manifest.name,
            image: manifest.image,
            cmd: manifest.cmd,
            input_path: manifest.input_path,
            output: manifest.output,
            parser,
            path_transformations: PathTransformations::new(rules),
            default_options: manifest.default_options,
            success_exit_codes: manifest.success_exit_codes,
        })
    }

    /// Resolve the command template with `params` layered over the defaults
    pub fn to_instance(&self, params: &Parameters) -> Result<ToolInstance> {
        let mut values = self.default_options.clone();
        values.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

        let cmd = template::fill(&self.cmd, &values)?;

        Ok(ToolInstance {
            name: self.name.clone(),
            image: self.image.clone(),
            cmd,
            input_path: self.input_path.clone(),
            output: self.output.clone(),
            parser: self.parser,
            path_transformations: self.path_transformations.clone(),
            success_exit_codes: self.success_exit_codes.clone(),
        })
    }

    /// Instance using only the defaults
    pub fn default_instance(&self) -> Result<ToolInstance> {
        self.to_instance(&Parameters::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn cmd(&self) -> &[String] {
        &self.cmd
    }

    pub fn input_path(&self) -> &str {
        &self.input_path
    }

    pub fn output(&self) -> &OutputStrategy {
        &self.output
    }

    pub fn parser(&self) -> Parser {
        self.parser
    }

    pub fn default_options(&self) -> &Parameters {
        &self.default_options
    }

    pub fn path_transformations(&self) -> &PathTransformations {
        &self.path_transformations
    }
}

// ============================================================================
// ToolInstance
// ============================================================================

/// A tool with a fully resolved command, ready to run once
#[derive(Debug, Clone)]
pub struct ToolInstance {
    name: String,
    image: String,
    cmd: Vec<String>,
    input_path: String,
    output: OutputStrategy,
    parser: Parser,
    path_transformations: PathTransformations,
    success_exit_codes: Vec<i64>,
}

impl ToolInstance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn cmd(&self) -> &[String] {
        &self.cmd
    }

    pub fn input_path(&self) -> &str {
        &self.input_path
    }

    pub fn output(&self) -> &OutputStrategy {
        &self.output
    }

    pub fn parser(&self) -> Parser {
        self.parser
    }

    pub fn path_transformations(&self) -> &PathTransformations {
        &self.path_transformations
    }

    /// Whether a container exit code still counts as a completed scan
    pub fn accepts_exit_code(&self, code: i64) -> bool {
        self.success_exit_codes.contains(&code)
    }

    /// Parse raw tool output into a report
    pub fn parse(&self, raw: &[u8]) -> Result<Report> {
        let report = self.parser.parse(raw)?;
        debug!(
            "{}: parsed {} findings with {}",
            self.name,
            report.finding_count(),
            self.parser.id()
        );
        Ok(report)
    }

    /// Parse raw output and map container paths back to host paths
    pub fn normalize(&self, raw: &[u8]) -> Result<Report> {
        let mut report = self.parse(raw)?;
        report.rewrite_paths(&self.path_transformations);
        Ok(report)
    }
}
