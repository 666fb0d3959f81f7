//! Testing utilities for the AI News Crew workspace
//!
//! Shared fake crew runners, fixtures and helpers.

#![allow(missing_docs)]

use news_core::{
    CrewInputs, CrewRunner, ExecutionError, NoopObservability, Observability, RequestPipeline,
    SessionId, SessionMetadata, Topic, TopicRules,
};
use parking_lot::Mutex;
use std::sync::Arc;

pub const SAMPLE_REPORT: &str = "# Test Report\n\nThis is a test report.";

pub const VALID_TOPICS: &[&str] = &[
    "AI and Machine Learning",
    "Quantum Computing Advances",
    "Climate Change Solutions",
    "Space Exploration Technologies",
    "Renewable Energy Systems",
];

type Responder = Box<dyn Fn(&CrewInputs) -> Result<String, ExecutionError> + Send + Sync>;

/// Runner that answers from a closure and records every call
pub struct ScriptedRunner {
    respond: Responder,
    calls: Mutex<Vec<CrewInputs>>,
}

impl ScriptedRunner {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&CrewInputs) -> Result<String, ExecutionError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always returns the given markdown
    pub fn succeeding(markdown: impl Into<String>) -> Self {
        let markdown = markdown.into();
        Self::new(move |_| Ok(markdown.clone()))
    }

    /// Always fails with an error built by `make`
    pub fn failing<F>(make: F) -> Self
    where
        F: Fn() -> ExecutionError + Send + Sync + 'static,
    {
        Self::new(move |_| Err(make()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_call(&self) -> Option<CrewInputs> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait::async_trait]
impl CrewRunner for ScriptedRunner {
    async fn invoke(&self, inputs: CrewInputs) -> Result<String, ExecutionError> {
        let result = (self.respond)(&inputs);
        self.calls.lock().push(inputs);
        result
    }
}

pub fn noop_observability() -> Arc<dyn Observability> {
    Arc::new(NoopObservability::new("disabled for tests"))
}

/// Pipeline over a shared runner so the test can inspect it afterwards
pub fn setup_pipeline(runner: Arc<ScriptedRunner>) -> RequestPipeline {
    RequestPipeline::new(runner, noop_observability())
}

/// Crew inputs for a topic that is known to be valid
pub fn sample_inputs(topic: &str, current_year: i32) -> CrewInputs {
    let topic = Topic::parse(topic, &TopicRules::default()).expect("valid test topic");
    CrewInputs {
        topic: topic.clone(),
        current_year,
        session_metadata: SessionMetadata::new(SessionId::new(), topic, false),
    }
}
