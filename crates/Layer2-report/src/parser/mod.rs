//! Parser registry
//!
//! Maps an identifier named in a tool definition to the function that turns
//! the tool's raw output into a canonical report.

mod glitch;
mod sarif;

pub use glitch::parse_glitch;
pub use sarif::{parse_kics, parse_sarif};

use crate::sarif::Report;
use infrarun_foundation::{Error, Result};
use std::collections::HashMap;

/// Raw tool output → canonical report
pub type ParseFn = fn(&[u8]) -> Result<Report>;

/// A resolved parser
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    id: &'static str,
    parse: ParseFn,
}

impl Parser {
    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn parse(&self, data: &[u8]) -> Result<Report> {
        (self.parse)(data)
    }
}

/// Identifier → parser table
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    parsers: HashMap<&'static str, ParseFn>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ParserRegistry {
    /// Registry without any parser
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// `sarif`, `glitch` and `kics`
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("sarif", parse_sarif);
        registry.register("glitch", parse_glitch);
        registry.register("kics", parse_kics);
        registry
    }

    /// Add or replace a parser
    pub fn register(&mut self, id: &'static str, parse: ParseFn) {
        self.parsers.insert(id, parse);
    }

    pub fn get(&self, id: &str) -> Result<Parser> {
        self.parsers
            .get_key_value(id)
            .map(|(id, parse)| Parser {
                id: *id,
                parse: *parse,
            })
            .ok_or_else(|| Error::ParserNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parsers.contains_key(id)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.parsers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report(_: &[u8]) -> Result<Report> {
        Ok(Report::new())
    }

    #[test]
    fn test_builtin_ids() {
        assert_eq!(ParserRegistry::builtin().ids(), vec!["glitch", "kics", "sarif"]);
    }

    #[test]
    fn test_unknown_parser() {
        let err = ParserRegistry::builtin().get("tfsec").unwrap_err();
        assert!(matches!(err, Error::ParserNotFound(ref id) if id == "tfsec"));
    }

    #[test]
    fn test_register_custom() {
        let mut registry = ParserRegistry::empty();
        assert!(!registry.contains("custom"));

        registry.register("custom", empty_report);
        let parser = registry.get("custom").unwrap();
        assert_eq!(parser.id(), "custom");
        assert!(parser.parse(b"ignored").unwrap().runs.is_empty());
    }
}
