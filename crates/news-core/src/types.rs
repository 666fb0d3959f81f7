//! Core types for the request pipeline
//!
//! Defines the data passed through one submission:
//! - Session identity and per-run metadata
//! - The inputs handed to the crew
//! - The report and its export form
//! - The execution outcome

use crate::error::ErrorCategory;
use crate::validation::Topic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

/// Interface tag attached to every session
pub const INTERFACE_TAG: &str = "ui";

/// Opaque session identifier (ULID for sortability)
///
/// Generated once per UI session and shared by every submission in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// Advisory tags for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMetadata {
    /// Session the run belongs to
    #[serde(serialize_with = "serialize_display")]
    pub session_id: SessionId,
    /// Validated topic
    pub topic: Topic,
    /// Submission time
    #[serde(rename = "timestamp")]
    pub submitted_at: DateTime<Utc>,
    /// Interface tag, always [`INTERFACE_TAG`]
    pub interface: &'static str,
    /// Whether an observability backend is active
    pub observability_enabled: bool,
}

impl SessionMetadata {
    /// Build metadata for a run submitted now
    #[must_use]
    pub fn new(session_id: SessionId, topic: Topic, observability_enabled: bool) -> Self {
        Self::at(session_id, topic, Utc::now(), observability_enabled)
    }

    /// Build metadata with an explicit submission time
    #[must_use]
    pub fn at(
        session_id: SessionId,
        topic: Topic,
        submitted_at: DateTime<Utc>,
        observability_enabled: bool,
    ) -> Self {
        Self {
            session_id,
            topic,
            submitted_at,
            interface: INTERFACE_TAG,
            observability_enabled,
        }
    }
}

fn serialize_display<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: std::fmt::Display,
{
    serializer.collect_str(value)
}

/// Inputs handed to the crew for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewInputs {
    /// Research topic
    pub topic: Topic,
    /// Year the crew should treat as current
    pub current_year: i32,
    /// Advisory metadata; the crew may ignore it
    pub session_metadata: SessionMetadata,
}

impl CrewInputs {
    /// Key/value map in the shape the crew's kickoff expects
    ///
    /// The year is rendered as a string because the crew interpolates it
    /// into its task templates.
    #[must_use]
    pub fn to_kickoff_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("topic".to_string(), Value::String(self.topic.to_string()));
        map.insert(
            "current_year".to_string(),
            Value::String(self.current_year.to_string()),
        );
        // SessionMetadata only holds strings, a bool and a timestamp
        let metadata = serde_json::to_value(&self.session_metadata).unwrap_or(Value::Null);
        map.insert("session_metadata".to_string(), metadata);
        map
    }
}

/// Markdown report produced by the crew
///
/// Opaque: displayed verbatim, never parsed or mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report(String);

impl Report {
    /// Wrap crew output
    #[inline]
    #[must_use]
    pub fn new(markdown: impl Into<String>) -> Self {
        Self(markdown.into())
    }

    /// Markdown text
    #[inline]
    #[must_use]
    pub fn as_markdown(&self) -> &str {
        &self.0
    }

    /// Downloadable form of the report
    ///
    /// Produces bytes only; nothing is written.
    #[must_use]
    pub fn export(&self, session_id: &SessionId) -> ReportExport {
        ReportExport {
            file_name: format!("research_report_{session_id}.md"),
            mime_type: ReportExport::MIME_TYPE,
            bytes: self.0.clone().into_bytes(),
        }
    }
}

/// A report packaged for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportExport {
    /// Suggested file name
    pub file_name: String,
    /// Content type
    pub mime_type: &'static str,
    /// Exact report bytes
    pub bytes: Vec<u8>,
}

impl ReportExport {
    /// Content type of exported reports
    pub const MIME_TYPE: &'static str = "text/markdown";
}

/// A categorised, user-readable failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Error category
    pub category: ErrorCategory,
    /// Human-readable message
    pub message: String,
}

impl Failure {
    /// Create new failure
    #[inline]
    #[must_use]
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// Troubleshooting hint for the category
    #[inline]
    #[must_use]
    pub fn hint(&self) -> &'static str {
        self.category.hint()
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category.title(), self.message)
    }
}

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The crew produced a report
    Success(Report),
    /// Validation rejected the topic or the crew call failed
    Failure(Failure),
}

impl ExecutionOutcome {
    /// Check if the run produced a report
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Report, if any
    #[inline]
    #[must_use]
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Success(report) => Some(report),
            Self::Failure(_) => None,
        }
    }

    /// Failure category, if any
    #[inline]
    #[must_use]
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::TopicRules;
    use chrono::TimeZone;

    fn topic(text: &str) -> Topic {
        Topic::parse(text, &TopicRules::default()).unwrap()
    }

    #[test]
    fn session_id_format() {
        let id = SessionId::new();
        let rendered = id.to_string();
        assert!(rendered.starts_with("session_"));
        assert_eq!(rendered.len(), "session_".len() + 26);
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn kickoff_map_shape() {
        let session_id = SessionId::new();
        let submitted_at = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let inputs = CrewInputs {
            topic: topic("Test Topic"),
            current_year: 2025,
            session_metadata: SessionMetadata::at(session_id, topic("Test Topic"), submitted_at, true),
        };

        let map = inputs.to_kickoff_map();
        assert_eq!(map["topic"], "Test Topic");
        assert_eq!(map["current_year"], "2025");

        let metadata = &map["session_metadata"];
        assert_eq!(metadata["session_id"], session_id.to_string());
        assert_eq!(metadata["topic"], "Test Topic");
        assert_eq!(metadata["timestamp"], "2025-01-06T10:00:00Z");
        assert_eq!(metadata["interface"], "ui");
        assert_eq!(metadata["observability_enabled"], true);
    }

    #[test]
    fn export_keeps_bytes_verbatim() {
        let markdown = "# Report\n\n* one\n* two\n";
        let report = Report::new(markdown);
        let session_id = SessionId::new();

        let export = report.export(&session_id);
        assert_eq!(export.bytes, markdown.as_bytes());
        assert_eq!(export.mime_type, "text/markdown");
        assert_eq!(export.file_name, format!("research_report_{session_id}.md"));
    }

    #[test]
    fn outcome_accessors() {
        let ok = ExecutionOutcome::Success(Report::new("# ok"));
        assert!(ok.is_success());
        assert_eq!(ok.report().map(Report::as_markdown), Some("# ok"));
        assert_eq!(ok.category(), None);

        let failed = ExecutionOutcome::Failure(Failure::new(ErrorCategory::Connection, "refused"));
        assert!(!failed.is_success());
        assert_eq!(failed.category(), Some(ErrorCategory::Connection));
        assert!(failed.report().is_none());
    }
}
