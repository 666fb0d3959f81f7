//! Crew backend configuration

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Which crew backend to use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrewBackendConfig {
    /// Launch the crew program once per run
    Process(ProcessConfig),
    /// Post to a running crew service
    Http(HttpConfig),
}

impl CrewBackendConfig {
    /// Short backend name for logs and status lines
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Process(_) => "process",
            Self::Http(_) => "http",
        }
    }
}

impl Default for CrewBackendConfig {
    fn default() -> Self {
        Self::Process(ProcessConfig::default())
    }
}

/// Subprocess backend settings
///
/// The program receives the kickoff inputs as a JSON object on stdin and in
/// the `CREW_INPUTS` environment variable, and prints the report on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl ProcessConfig {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::new("crewai").with_args(["run"])
    }
}

/// HTTP backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Kickoff endpoint
    pub endpoint: String,
    /// Bearer token; redacted when serialised
    #[serde(serialize_with = "redact", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment
    pub use_system_proxy: bool,
}

impl HttpConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            use_system_proxy: true,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn without_proxy(mut self) -> Self {
        self.use_system_proxy = false;
        self
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000/kickoff")
    }
}

fn redact<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_str("***"),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_process() {
        let config = CrewBackendConfig::default();
        assert_eq!(config.kind(), "process");
        let CrewBackendConfig::Process(process) = config else {
            panic!("expected process backend");
        };
        assert_eq!(process.program, "crewai");
        assert_eq!(process.args, vec!["run".to_string()]);
    }

    #[test]
    fn tagged_json_shape() {
        let config: CrewBackendConfig =
            serde_json::from_str(r#"{"kind":"http","endpoint":"http://crew:9000/run"}"#).unwrap();
        assert_eq!(config, CrewBackendConfig::Http(HttpConfig::new("http://crew:9000/run")));
    }

    #[test]
    fn process_table_from_toml() {
        let config: CrewBackendConfig = toml::from_str(
            r#"
kind = "process"
program = "python3"
args = ["-m", "ai_news_crew.main"]
working_dir = "/srv/crew"

[env]
OPENAI_MODEL_NAME = "gpt-4o-mini"
"#,
        )
        .unwrap();

        let expected = ProcessConfig::new("python3")
            .with_args(["-m", "ai_news_crew.main"])
            .with_working_dir("/srv/crew")
            .with_env("OPENAI_MODEL_NAME", "gpt-4o-mini");
        assert_eq!(config, CrewBackendConfig::Process(expected));
    }

    #[test]
    fn api_key_is_redacted() {
        let config = CrewBackendConfig::Http(HttpConfig::default().with_api_key("sk-secret"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("***"));
    }
}
