//! Path rewriting
//!
//! Tools report paths as seen inside their container. An ordered list of
//! regex rules maps them back to host paths; the first rule that matches a
//! path wins and the remaining rules are not consulted.

use crate::sarif::{ArtifactLocation, Location, Report};
use infrarun_foundation::{Error, Result};
use regex::Regex;
use tracing::debug;

const FILE_SCHEME: &str = "file://";

// ============================================================================
// Rules
// ============================================================================

/// One `pattern → replacement` rule
///
/// The replacement may use `$1`/`${name}` capture references and is applied
/// to every match in the path.
#[derive(Debug, Clone)]
pub struct PathTransformation {
    pattern: Regex,
    replacement: String,
}

impl PathTransformation {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidPathTransformation {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            pattern: regex,
            replacement: replacement.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Rewritten path, or `None` when the pattern does not match
    pub fn apply(&self, path: &str) -> Option<String> {
        if !self.pattern.is_match(path) {
            return None;
        }
        Some(
            self.pattern
                .replace_all(path, self.replacement.as_str())
                .into_owned(),
        )
    }
}

/// Ordered rule list
#[derive(Debug, Clone, Default)]
pub struct PathTransformations {
    rules: Vec<PathTransformation>,
}

impl PathTransformations {
    pub fn new(rules: Vec<PathTransformation>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: PathTransformation) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathTransformation> {
        self.rules.iter()
    }

    /// Result of the first matching rule, `None` when none matches
    pub fn try_apply(&self, path: &str) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.apply(path))
    }

    /// Rewritten path, or the input unchanged
    pub fn apply(&self, path: &str) -> String {
        self.try_apply(path).unwrap_or_else(|| path.to_string())
    }
}

// ============================================================================
// URIs
// ============================================================================

/// Rewrite a location URI
///
/// Plain paths are rewritten as-is. `file:` URIs (`file:///p`,
/// `file://localhost/p` or `file:/p`) are decoded to a path, rewritten and
/// re-encoded through [`path_to_uri`], keeping any query or fragment. A URI
/// no rule matches is returned untouched.
pub fn rewrite_uri(uri: &str, rules: &PathTransformations) -> String {
    if rules.is_empty() {
        return uri.to_string();
    }

    let Some(encoded) = file_uri_path(uri) else {
        return rules.apply(uri);
    };

    let (encoded, suffix) = match encoded.find(['?', '#']) {
        Some(at) => encoded.split_at(at),
        None => (encoded, ""),
    };

    let path = match urlencoding::decode(encoded) {
        Ok(path) => path,
        Err(e) => {
            debug!("Leaving undecodable URI {} as-is: {}", uri, e);
            return uri.to_string();
        }
    };

    match rules.try_apply(&path) {
        Some(rewritten) => format!("{}{}", path_to_uri(&rewritten), suffix),
        None => uri.to_string(),
    }
}

/// Still-encoded path part of a `file:` URI
fn file_uri_path(uri: &str) -> Option<&str> {
    if let Some(rest) = uri.strip_prefix(FILE_SCHEME) {
        return Some(match rest.strip_prefix("localhost") {
            Some(path) if path.starts_with('/') => path,
            _ => rest,
        });
    }

    uri.strip_prefix("file:").filter(|path| path.starts_with('/'))
}

/// Encode a filesystem path as a URI
///
/// Absolute paths become `file://` URIs; relative paths become relative
/// references. Each segment is percent-encoded.
pub fn path_to_uri(path: &str) -> String {
    let encoded = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    if path.starts_with('/') {
        format!("{}{}", FILE_SCHEME, encoded)
    } else {
        encoded
    }
}

// ============================================================================
// Report traversal
// ============================================================================

impl Report {
    /// Rewrite every path-bearing field, returning how many changed
    ///
    /// Covers base URIs, artifacts, result and related locations, and fix
    /// targets.
    pub fn rewrite_paths(&mut self, rules: &PathTransformations) -> usize {
        if rules.is_empty() {
            return 0;
        }

        let mut changed = 0;
        for run in &mut self.runs {
            for base in run.original_uri_base_ids.values_mut() {
                changed += rewrite_artifact_location(base, rules);
            }

            for artifact in &mut run.artifacts {
                if let Some(location) = artifact.location.as_mut() {
                    changed += rewrite_artifact_location(location, rules);
                }
            }

            for finding in &mut run.results {
                for location in finding
                    .locations
                    .iter_mut()
                    .chain(finding.related_locations.iter_mut())
                {
                    changed += rewrite_location(location, rules);
                }

                for change in finding
                    .fixes
                    .iter_mut()
                    .flat_map(|fix| fix.artifact_changes.iter_mut())
                {
                    changed += rewrite_artifact_location(&mut change.artifact_location, rules);
                }
            }
        }

        debug!("Rewrote {} paths", changed);
        changed
    }
}

fn rewrite_location(location: &mut Location, rules: &PathTransformations) -> usize {
    location
        .physical_location
        .as_mut()
        .and_then(|p| p.artifact_location.as_mut())
        .map_or(0, |a| rewrite_artifact_location(a, rules))
}

fn rewrite_artifact_location(location: &mut ArtifactLocation, rules: &PathTransformations) -> usize {
    let Some(uri) = location.uri.as_mut() else {
        return 0;
    };

    let rewritten = rewrite_uri(uri, rules);
    if rewritten == *uri {
        return 0;
    }
    *uri = rewritten;
    1
}

// ============================================================================
// Tests
// ============================================================================
