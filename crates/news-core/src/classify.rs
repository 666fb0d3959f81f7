//! Failure classification
//!
//! Maps an [`ExecutionError`] onto an [`ErrorCategory`] in two stages:
//! 1. Structural hint from the error variant (HTTP status, connection
//!    failure, killed process)
//! 2. Ordered message rules from configuration, first match wins
//!
//! Anything left unmatched is `General`.

use crate::error::{ConfigError, ErrorCategory, ExecutionError};
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

/// One message rule: any pattern matching selects the category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Category selected by this rule
    pub category: ErrorCategory,
    /// Case-insensitive regular expressions
    pub patterns: Vec<String>,
}

impl ClassificationRule {
    /// Create new rule
    #[must_use]
    pub fn new<I, S>(category: ErrorCategory, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered classification rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Rules in evaluation order
    pub rules: Vec<ClassificationRule>,
}

impl ClassificationConfig {
    /// Config with no message rules (structural hints only)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                ClassificationRule::new(
                    ErrorCategory::Api,
                    [
                        r"api[ _-]?key",
                        r"authenticat",
                        r"unauthori[sz]ed",
                        r"quota",
                        r"rate[ _-]?limit",
                        r"invalid_api_key",
                        r"insufficient_quota",
                    ],
                ),
                ClassificationRule::new(
                    ErrorCategory::Connection,
                    [
                        r"connection",
                        r"connect",
                        r"network",
                        r"unreachable",
                        r"timed out",
                        r"\bdns\b",
                        r"refused",
                    ],
                ),
                ClassificationRule::new(
                    ErrorCategory::Memory,
                    [
                        r"out of memory",
                        r"memoryerror",
                        r"cannot allocate",
                        r"\boom\b",
                        r"resource exhausted",
                    ],
                ),
            ],
        }
    }
}

/// Compiled classifier
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<(ErrorCategory, RegexSet)>,
}

impl ErrorClassifier {
    /// Compile the configured rules
    ///
    /// # Errors
    /// `ConfigError::InvalidPattern` for the first pattern that does not compile
    pub fn new(config: &ClassificationConfig) -> Result<Self, ConfigError> {
        let rules = config
            .rules
            .iter()
            .map(|rule| compile_rule(rule).map(|set| (rule.category, set)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Classify a crew failure
    #[must_use]
    pub fn classify(&self, error: &ExecutionError) -> ErrorCategory {
        if let Some(category) = error.category_hint() {
            return category;
        }
        self.classify_message(&error.to_string())
    }

    /// Classify by message text only
    #[must_use]
    pub fn classify_message(&self, message: &str) -> ErrorCategory {
        self.rules
            .iter()
            .find(|(_, set)| set.is_match(message))
            .map_or(ErrorCategory::General, |(category, _)| *category)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        // The built-in patterns are covered by tests below
        Self::new(&ClassificationConfig::default()).unwrap_or_else(|_| Self { rules: Vec::new() })
    }
}

fn compile_rule(rule: &ClassificationRule) -> Result<RegexSet, ConfigError> {
    // Compile individually first so the error names the offending pattern
    for pattern in &rule.patterns {
        regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
    }
    RegexSetBuilder::new(&rule.patterns)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::InvalidPattern {
            pattern: rule.patterns.join(" | "),
            source,
        })
}
