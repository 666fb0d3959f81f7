//! Application configuration
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. TOML file from `--config` or `NEWS_CREW_CONFIG`
//! 3. Standard `OTEL_*` variables for the telemetry section, and
//!    `NEWS_CREW_API_KEY` for an HTTP backend without a key
//!
//! The environment is read, never written.

use news_core::{
    ClassificationConfig, ConfigError, ErrorClassifier, Observability, RequestPipeline,
    TelemetryConfig, TopicRules,
};
use news_crew::{build_runner, CrewBackendConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) const ENV_CONFIG: &str = "NEWS_CREW_CONFIG";
pub(crate) const ENV_API_KEY: &str = "NEWS_CREW_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) topic: TopicRules,
    pub(crate) classification: ClassificationConfig,
    pub(crate) telemetry: TelemetryConfig,
    pub(crate) crew: CrewBackendConfig,
}

impl AppConfig {
    /// Load from the given file, `NEWS_CREW_CONFIG`, or defaults, then apply
    /// environment overrides from the process environment.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| lookup(ENV_CONFIG).map(PathBuf::from));

        let config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(lookup))
    }

    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub(crate) fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    #[must_use]
    pub(crate) fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let CrewBackendConfig::Http(http) = &mut self.crew {
            if http.api_key.is_none() {
                http.api_key = lookup(ENV_API_KEY);
            }
        }
        self.telemetry = self.telemetry.with_env_overrides(lookup);
        self
    }

    /// Effective configuration as TOML (secrets redacted)
    pub(crate) fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Build the pipeline for one UI session
    ///
    /// Rejects inconsistent topic rules and invalid classification patterns
    /// here, at startup.
    pub(crate) fn build_pipeline(
        &self,
        observability: Arc<dyn Observability>,
    ) -> Result<RequestPipeline, ConfigError> {
        self.topic.check()?;
        let classifier = ErrorClassifier::new(&self.classification)?;
        Ok(RequestPipeline::new(build_runner(&self.crew), observability)
            .with_topic_rules(self.topic.clone())
            .with_classifier(classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use news_core::{ErrorCategory, NoopObservability};
    use news_crew::HttpConfig;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
[topic]
max_chars = 120

[telemetry]
enabled = false

[crew]
kind = "http"
endpoint = "http://crew:8000/kickoff"

[[classification.rules]]
category = "memory"
patterns = ["context length"]
"#,
        )
        .unwrap();

        assert_eq!(config.topic.min_chars, 3);
        assert_eq!(config.topic.max_chars, 120);
        assert!(!config.telemetry.enabled);
        assert_eq!(config.telemetry.service_name, "ai-news-crew");
        assert_eq!(config.crew, CrewBackendConfig::Http(HttpConfig::new("http://crew:8000/kickoff")));
        assert_eq!(config.classification.rules.len(), 1);
        assert_eq!(config.classification.rules[0].category, ErrorCategory::Memory);
    }

    #[test]
    fn unknown_backend_is_parse_error() {
        let err = AppConfig::from_toml_str("[crew]\nkind = \"carrier-pigeon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[topic]\nmin_chars = 5").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.topic.min_chars, 5);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_overrides_telemetry_and_api_key() {
        let config = AppConfig {
            crew: CrewBackendConfig::Http(HttpConfig::default()),
            ..AppConfig::default()
        }
        .with_env_overrides(env(&[
            ("OTEL_SERVICE_NAME", "custom-service"),
            ("NEWS_CREW_API_KEY", "sk-env"),
        ]));

        assert_eq!(config.telemetry.service_name, "custom-service");
        let CrewBackendConfig::Http(http) = &config.crew else {
            panic!("expected http backend");
        };
        assert_eq!(http.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn file_api_key_beats_env() {
        let config = AppConfig {
            crew: CrewBackendConfig::Http(HttpConfig::default().with_api_key("sk-file")),
            ..AppConfig::default()
        }
        .with_env_overrides(env(&[("NEWS_CREW_API_KEY", "sk-env")]));

        let CrewBackendConfig::Http(http) = &config.crew else {
            panic!("expected http backend");
        };
        assert_eq!(http.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn effective_config_round_trips() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(AppConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn build_rejects_bad_rules_and_patterns() {
        let observability: Arc<dyn Observability> = Arc::new(NoopObservability::new("test"));

        let config = AppConfig {
            topic: TopicRules::default().with_bounds(50, 10),
            ..AppConfig::default()
        };
        assert!(config.build_pipeline(observability.clone()).is_err());

        let config = AppConfig::from_toml_str(
            "[[classification.rules]]\ncategory = \"api\"\npatterns = [\"(\"]\n",
        )
        .unwrap();
        assert!(matches!(
            config.build_pipeline(observability.clone()),
            Err(ConfigError::InvalidPattern { .. })
        ));

        assert!(AppConfig::default().build_pipeline(observability).is_ok());
    }
}
