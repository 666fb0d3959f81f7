//! Error types for the request pipeline
//!
//! Provides the error taxonomy for:
//! - Topic validation (handled locally, never reaches the crew)
//! - Failures surfaced by the crew at the call boundary
//! - Configuration problems detected at startup
//! - Illegal pipeline state transitions

use crate::state_machine::PipelineState;
use serde::{Deserialize, Serialize};

/// Topic validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Trimmed topic shorter than the configured minimum
    #[error("Topic must be at least {min} characters long (got {actual}).")]
    TooShort { min: usize, actual: usize },

    /// Trimmed topic longer than the configured maximum
    #[error("Topic must be at most {max} characters long (got {actual}).")]
    TooLong { max: usize, actual: usize },

    /// Empty or whitespace-only topic
    #[error("Please enter a topic to research.")]
    Empty,

    /// Topic contains a control or markup character
    #[error("Topic contains a disallowed character {ch:?} at position {position}.")]
    DisallowedCharacter { ch: char, position: usize },
}

/// Failure surfaced by a crew runner
///
/// This is the only error type that crosses the orchestration boundary.
/// Runners map their transport-specific failures onto these variants so the
/// classifier can work from structure first and message text second.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The crew service or model provider answered with an HTTP error
    #[error("crew service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The crew service could not be reached
    #[error("connection error: {0}")]
    Connection(String),

    /// The crew program could not be started
    #[error("failed to launch crew program `{program}`: {message}")]
    Launch { program: String, message: String },

    /// The crew program exited unsuccessfully
    #[error("crew program failed (exit code {code:?}, signal {signal:?}): {stderr}")]
    Process {
        code: Option<i32>,
        signal: Option<i32>,
        stderr: String,
    },

    /// The crew produced output that could not be used as a report
    #[error("invalid crew output: {0}")]
    InvalidOutput(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl ExecutionError {
    /// Category implied by the error's structure alone, if any
    ///
    /// Message-based rules only run when this returns `None`.
    #[must_use]
    pub fn category_hint(&self) -> Option<ErrorCategory> {
        match self {
            Self::Status { status, .. } => match status {
                401 | 402 | 403 | 429 | 500..=599 => Some(ErrorCategory::Api),
                _ => None,
            },
            Self::Connection(_) => Some(ErrorCategory::Connection),
            Self::Process { code, signal, .. } => {
                // SIGKILL / 128+9: the usual signature of the OOM killer
                if *signal == Some(9) || *code == Some(137) {
                    Some(ErrorCategory::Memory)
                } else {
                    None
                }
            }
            Self::Launch { .. } | Self::InvalidOutput(_) | Self::Other(_) => None,
        }
    }
}

/// User-facing failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Topic rejected before any crew call
    Validation,
    /// Authentication, quota or provider failure
    Api,
    /// Network reachability
    Connection,
    /// Resource exhaustion
    Memory,
    /// Anything else
    General,
}

impl ErrorCategory {
    /// Short title shown above the error message
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid topic",
            Self::Api => "API error",
            Self::Connection => "Connection error",
            Self::Memory => "Memory error",
            Self::General => "An error occurred during research",
        }
    }

    /// Troubleshooting hint shown below the error message
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Validation => {
                "Enter a short, plain-text research topic without markup or control characters."
            }
            Self::Api => {
                "Check that your API key is set and valid, and that your provider account has remaining quota."
            }
            Self::Connection => {
                "Check your network connection and make sure the model provider or crew service is reachable."
            }
            Self::Memory => {
                "The crew ran out of resources. Try a narrower topic or free up memory and try again."
            }
            Self::General => "Please try again or check your configuration.",
        }
    }

    /// Whether this category classifies a failure of the crew call
    #[inline]
    #[must_use]
    pub fn is_execution_failure(&self) -> bool {
        !matches!(self, Self::Validation)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "ValidationError",
            Self::Api => "ApiError",
            Self::Connection => "ConnectionError",
            Self::Memory => "MemoryError",
            Self::General => "GeneralError",
        };
        f.write_str(name)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A classification pattern is not a valid regular expression
    #[error("invalid classification pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Topic rules are inconsistent
    #[error("invalid topic rules: {0}")]
    InvalidTopicRules(String),

    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Effective config could not be rendered
    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

/// Illegal pipeline state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal pipeline transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: PipelineState,
    pub to: PipelineState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_limit() {
        let err = ValidationError::TooShort { min: 3, actual: 2 };
        assert!(err.to_string().contains("at least 3"));

        let err = ValidationError::TooLong { max: 200, actual: 201 };
        assert!(err.to_string().contains("at most 200"));
    }

    #[test]
    fn status_hints() {
        let hint = |status| ExecutionError::Status { status, body: String::new() }.category_hint();
        assert_eq!(hint(401), Some(ErrorCategory::Api));
        assert_eq!(hint(429), Some(ErrorCategory::Api));
        assert_eq!(hint(503), Some(ErrorCategory::Api));
        assert_eq!(hint(404), None);
    }

    #[test]
    fn killed_process_hints_memory() {
        let err = ExecutionError::Process {
            code: None,
            signal: Some(9),
            stderr: String::new(),
        };
        assert_eq!(err.category_hint(), Some(ErrorCategory::Memory));

        let err = ExecutionError::Process {
            code: Some(1),
            signal: None,
            stderr: "boom".to_string(),
        };
        assert_eq!(err.category_hint(), None);
    }

    #[test]
    fn categories_have_distinct_hints() {
        let all = [
            ErrorCategory::Validation,
            ErrorCategory::Api,
            ErrorCategory::Connection,
            ErrorCategory::Memory,
            ErrorCategory::General,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.hint(), b.hint());
            }
        }
    }

    #[test]
    fn category_display_uses_taxonomy_names() {
        assert_eq!(ErrorCategory::Connection.to_string(), "ConnectionError");
        assert_eq!(ErrorCategory::Api.to_string(), "ApiError");
        assert!(!ErrorCategory::Validation.is_execution_failure());
        assert!(ErrorCategory::General.is_execution_failure());
    }

    #[test]
    fn config_errors_name_the_direction() {
        let parse = ConfigError::Parse("expected a table".to_string());
        let serialize = ConfigError::Serialize("unsupported value".to_string());
        assert_eq!(parse.to_string(), "failed to parse config: expected a table");
        assert_eq!(serialize.to_string(), "failed to serialize config: unsupported value");
    }
}
