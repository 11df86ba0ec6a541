//! # infrarun-report
//!
//! Canonical report handling for Infrarun:
//! - `sarif`: the canonical schema (a SARIF 2.1.0 subset) and merging
//! - `parser`: identifier → parsing function registry (`sarif`, `glitch`, `kics`)
//! - `rewrite`: ordered path transformations applied to every path-bearing field
//! - `rows`: flat, sorted finding rows for presentation layers

pub mod parser;
pub mod rewrite;
pub mod rows;
pub mod sarif;

pub use parser::{ParseFn, Parser, ParserRegistry};
pub use rewrite::{path_to_uri, rewrite_uri, PathTransformation, PathTransformations};
pub use rows::{summarize_message, FindingRow, MESSAGE_WIDTH};
pub use sarif::{
    Artifact, ArtifactChange, ArtifactLocation, Driver, Finding, Fix, Location, Message,
    PhysicalLocation, Region, Report, ReportRun, Rule, ToolComponent, DEFAULT_LEVEL,
    SARIF_SCHEMA, SARIF_VERSION,
};
