//! Tool Catalog - compiled tool definitions by name

use crate::definition::ToolDefinition;
use crate::manifest::ToolManifest;
use infrarun_foundation::{Error, Result};
use infrarun_report::ParserRegistry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Definitions shipped with the binary
const BUILTIN_TOOLS: [(&str, &str); 2] = [
    ("checkov.yaml", include_str!("../tools/checkov.yaml")),
    ("kics.yaml", include_str!("../tools/kics.yaml")),
];

/// Catalog of available tools
#[derive(Debug, Default, Clone)]
pub struct ToolCatalog {
    tools: HashMap<String, Arc<ToolDefinition>>,
}

impl ToolCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Catalog of the built-in tool definitions
    pub fn builtin(parsers: &ParserRegistry) -> Result<Self> {
        let mut catalog = Self::new();
        for (file, content) in BUILTIN_TOOLS {
            let manifest = ToolManifest::from_yaml(content)
                .map_err(|e| Error::Config(format!("builtin {}: {}", file, e)))?;
            catalog.register(ToolDefinition::compile(manifest, parsers)?)?;
        }
        Ok(catalog)
    }

    /// Add every tool of `other`, replacing tools with the same name
    pub fn extend_overriding(&mut self, other: ToolCatalog) {
        for (name, tool) in other.tools {
            if self.tools.insert(name.clone(), tool).is_some() {
                info!("Tool {} overridden by local definition", name);
            }
        }
    }

    /// Load every `*.yaml` / `*.yml` definition in `dir`
    ///
    /// Fails on the first definition that does not decode or compile, and on
    /// duplicate tool names.
    pub fn load_dir(dir: &Path, parsers: &ParserRegistry) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "tools directory {} does not exist",
                dir.display()
            )));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("yaml") | Some("yml")
                    )
            })
            .collect();
        files.sort();

        let mut catalog = Self::new();
        for path in files {
            let definition = load_file(&path, parsers)?;
            catalog.register(definition)?;
        }

        info!("Loaded {} tools from {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    /// Register a tool; a second tool with the same name is rejected
    pub fn register(&mut self, tool: ToolDefinition) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(Error::Config(format!("duplicate tool name {:?}", name)));
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Tools in name order
    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.names()
            .into_iter()
            .filter_map(move |name| self.tools.get(name).map(|t| t.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Decode and compile one definition file
pub fn load_file(path: &Path, parsers: &ParserRegistry) -> Result<ToolDefinition> {
    let content = std::fs::read_to_string(path)?;
    let manifest = ToolManifest::from_yaml(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    debug!("Decoded tool {} from {}", manifest.name, path.display());
    ToolDefinition::compile(manifest, parsers)
}
