//! Topic validation
//!
//! A topic is accepted only if, after trimming:
//! 1. its length in characters lies within the configured bounds
//! 2. it is not empty
//! 3. it contains no control characters and none of the disallowed characters
//!
//! Checks run in that order and the first failure wins. Validation is a pure
//! function of the input string and the rules.

use crate::error::{ConfigError, ValidationError};
use serde::{Deserialize, Serialize};

/// Characters rejected in addition to control characters
///
/// Angle brackets and backticks are markup; braces would be interpolated by
/// the crew's task templates.
pub const DEFAULT_DISALLOWED: &str = "<>{}`";

/// Validation bounds and character policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicRules {
    /// Minimum trimmed length in characters
    pub min_chars: usize,
    /// Maximum trimmed length in characters
    pub max_chars: usize,
    /// Characters rejected anywhere in the topic
    pub disallowed: String,
}

impl TopicRules {
    /// Create default rules
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With length bounds
    #[inline]
    #[must_use]
    pub fn with_bounds(mut self, min_chars: usize, max_chars: usize) -> Self {
        self.min_chars = min_chars;
        self.max_chars = max_chars;
        self
    }

    /// With disallowed character set
    #[inline]
    #[must_use]
    pub fn with_disallowed(mut self, disallowed: impl Into<String>) -> Self {
        self.disallowed = disallowed.into();
        self
    }

    /// Reject bounds that no topic could satisfy
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.min_chars > self.max_chars {
            return Err(ConfigError::InvalidTopicRules(format!(
                "min_chars ({}) exceeds max_chars ({})",
                self.min_chars, self.max_chars
            )));
        }
        if self.max_chars == 0 {
            return Err(ConfigError::InvalidTopicRules(
                "max_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn is_disallowed(&self, ch: char) -> bool {
        ch.is_control() || self.disallowed.contains(ch)
    }
}

impl Default for TopicRules {
    fn default() -> Self {
        Self {
            min_chars: 3,
            max_chars: 200,
            disallowed: DEFAULT_DISALLOWED.to_string(),
        }
    }
}

/// A validated research topic
///
/// Holds the trimmed text. The only way to obtain one is [`Topic::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Validate and trim a raw topic
    ///
    /// # Errors
    /// The first failed check, as a [`ValidationError`]
    pub fn parse(raw: &str, rules: &TopicRules) -> Result<Self, ValidationError> {
        validate_topic(raw, rules)?;
        Ok(Self(raw.trim().to_string()))
    }

    /// Topic text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check a raw topic against the rules without keeping it
pub fn validate_topic(raw: &str, rules: &TopicRules) -> Result<(), ValidationError> {
    let trimmed = raw.trim();
    let length = trimmed.chars().count();

    if length < rules.min_chars {
        return Err(ValidationError::TooShort {
            min: rules.min_chars,
            actual: length,
        });
    }
    if length > rules.max_chars {
        return Err(ValidationError::TooLong {
            max: rules.max_chars,
            actual: length,
        });
    }

    // Only reachable when min_chars is 0
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    if let Some((position, ch)) = trimmed
        .chars()
        .enumerate()
        .find(|(_, ch)| rules.is_disallowed(*ch))
    {
        return Err(ValidationError::DisallowedCharacter { ch, position });
    }

    Ok(())
}
