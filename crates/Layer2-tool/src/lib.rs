//! # infrarun-tool
//!
//! Tool model for Infrarun:
//! - `manifest`: the serialized tool description and parameter values
//! - `template`: `%{name}` placeholder resolution
//! - `definition`: compiled `ToolDefinition` and resolved `ToolInstance`
//! - `catalog`: tool definitions loaded from a directory

pub mod catalog;
pub mod definition;
pub mod manifest;
pub mod template;

pub use catalog::{load_file, ToolCatalog};
pub use definition::{ToolDefinition, ToolInstance};
pub use manifest::{OutputStrategy, ParamValue, Parameters, PathRuleSpec, ToolManifest};
