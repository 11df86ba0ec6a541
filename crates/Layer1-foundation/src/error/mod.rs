//! Error types for Infrarun
//!
//! Every layer reports failures through [`Error`]. Configuration-time errors
//! (templates, path rules, parser ids, config files) are kept apart from
//! per-run errors so callers can fail fast on the former.

use std::fmt;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Infrarun error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Parser not found: {0}")]
    ParserNotFound(String),

    #[error("Invalid path transformation {pattern:?}: {message}")]
    InvalidPathTransformation { pattern: String, message: String },

    // ========================================================================
    // Container backend
    // ========================================================================
    #[error("Image unavailable: {image} ({reason})")]
    ImageUnavailable { image: String, reason: String },

    #[error("Container {container_id} exited with code {exit_code}")]
    ContainerFailed { container_id: String, exit_code: i64 },

    #[error("Docker error: {0}")]
    Docker(String),

    #[error("Output read error: {0}")]
    OutputRead(String),

    // ========================================================================
    // Results
    // ========================================================================
    #[error("Parse error ({parser}): {message}")]
    Parse { parser: String, message: String },

    // ========================================================================
    // Execution
    // ========================================================================
    #[error("{tool}: {phase} phase failed: {source}")]
    Phase {
        tool: String,
        phase: ExecutionPhase,
        #[source]
        source: Box<Error>,
    },

    #[error("{failed} of {total} runs failed, first: {first}")]
    RunsFailed {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Placeholder substitution failures, raised while building a tool instance
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("undefined placeholder value {0:?}")]
    UndefinedPlaceholder(String),

    #[error("list substitution not allowed in non-isolated argument {argument:?} (placeholder {placeholder:?})")]
    TypeMismatch {
        argument: String,
        placeholder: String,
    },

    #[error("unsupported type for placeholder value {0:?}")]
    UnsupportedType(String),
}

/// Step of a single execution that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPhase {
    Image,
    Run,
    Output,
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionPhase::Image => "image",
            ExecutionPhase::Run => "run",
            ExecutionPhase::Output => "output-read",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Errors that can only come from bad configuration and must surface
    /// before any container starts
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::Template(_)
                | Error::ParserNotFound(_)
                | Error::InvalidPathTransformation { .. }
        )
    }

    /// Phase tag of a wrapped execution error
    pub fn phase(&self) -> Option<ExecutionPhase> {
        match self {
            Error::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Innermost error, looking through phase wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Phase { source, .. } => source.root(),
            other => other,
        }
    }

    /// Wrap an error with the tool name and the phase it failed in
    pub fn in_phase(self, tool: impl Into<String>, phase: ExecutionPhase) -> Self {
        Error::Phase {
            tool: tool.into(),
            phase,
            source: Box::new(self),
        }
    }

    /// Parse error helper
    pub fn parse(parser: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Parse {
            parser: parser.into(),
            message: message.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_flagged() {
        assert!(Error::ParserNotFound("x".into()).is_config_error());
        assert!(Error::Template(TemplateError::UndefinedPlaceholder("p".into())).is_config_error());
        assert!(!Error::Cancelled.is_config_error());
        assert!(!Error::ContainerFailed {
            container_id: "abc".into(),
            exit_code: 2
        }
        .is_config_error());
    }

    #[test]
    fn test_phase_wrapping() {
        let err = Error::OutputRead("missing results.sarif".into())
            .in_phase("kics", ExecutionPhase::Output);

        assert_eq!(err.phase(), Some(ExecutionPhase::Output));
        assert!(matches!(err.root(), Error::OutputRead(_)));
        assert!(err.to_string().contains("output-read"));
        assert!(err.to_string().starts_with("kics"));
    }
}
