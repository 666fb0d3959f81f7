//! Request pipeline
//!
//! Turns one submitted topic into either a report or a categorised failure:
//! 1. Validate the topic (no crew call on rejection)
//! 2. Build the session metadata envelope
//! 3. Invoke the crew once, tagged with the observability span
//! 4. Classify any failure
//!
//! Nothing is retained after a submission completes.

use crate::classify::ErrorClassifier;
use crate::error::{ErrorCategory, ValidationError};
use crate::observability::{Observability, ObservabilityStatus};
use crate::runner::CrewRunner;
use crate::state_machine::{validate_transition, PipelineState};
use crate::types::{CrewInputs, ExecutionOutcome, Failure, Report, SessionId, SessionMetadata};
use crate::validation::{Topic, TopicRules};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

/// The request pipeline for one UI session
///
/// `submit` takes `&mut self`, so a second submission cannot start while one
/// is in flight. Front ends that need to show progress subscribe to the
/// state channel.
pub struct RequestPipeline {
    runner: Arc<dyn CrewRunner>,
    observability: Arc<dyn Observability>,
    classifier: ErrorClassifier,
    rules: TopicRules,
    session_id: SessionId,
    state: watch::Sender<PipelineState>,
}

impl RequestPipeline {
    /// Create a pipeline with default rules and classifier
    #[must_use]
    pub fn new(runner: Arc<dyn CrewRunner>, observability: Arc<dyn Observability>) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            runner,
            observability,
            classifier: ErrorClassifier::default(),
            rules: TopicRules::default(),
            session_id: SessionId::new(),
            state,
        }
    }

    /// With topic rules
    #[inline]
    #[must_use]
    pub fn with_topic_rules(mut self, rules: TopicRules) -> Self {
        self.rules = rules;
        self
    }

    /// With classifier
    #[inline]
    #[must_use]
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// With an existing session ID
    #[inline]
    #[must_use]
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    /// Session this pipeline belongs to
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Receive state changes
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Observability indicator
    #[must_use]
    pub fn observability_status(&self) -> ObservabilityStatus {
        self.observability.status()
    }

    /// Topic rules in use
    #[inline]
    #[must_use]
    pub fn topic_rules(&self) -> &TopicRules {
        &self.rules
    }

    /// Validate without submitting
    pub fn validate(&self, topic: &str) -> Result<Topic, ValidationError> {
        Topic::parse(topic, &self.rules)
    }

    /// Submit a topic
    ///
    /// Awaits the crew for as long as it takes; there is no timeout and no
    /// retry. Exactly one crew call is made for an accepted topic and none
    /// for a rejected one.
    pub async fn submit(&mut self, topic: &str, current_year: i32) -> ExecutionOutcome {
        let topic = match Topic::parse(topic, &self.rules) {
            Ok(topic) => topic,
            Err(e) => {
                tracing::warn!("Topic rejected: {}", e);
                return ExecutionOutcome::Failure(Failure::new(ErrorCategory::Validation, e.to_string()));
            }
        };

        let metadata = SessionMetadata::new(
            self.session_id,
            topic.clone(),
            self.observability.status().is_active(),
        );
        let span = self.observability.session_span(&metadata);
        let inputs = CrewInputs {
            topic,
            current_year,
            session_metadata: metadata,
        };

        tracing::info!(
            session_id = %self.session_id,
            "Starting research on: {}",
            inputs.topic
        );

        let result = {
            let _processing = ProcessingGuard::enter(&self.state);
            self.runner.invoke(inputs).instrument(span.clone()).await
        };

        match result {
            Ok(markdown) => {
                span.in_scope(|| tracing::info!("Research completed ({} bytes)", markdown.len()));
                ExecutionOutcome::Success(Report::new(markdown))
            }
            Err(e) => {
                let category = self.classifier.classify(&e);
                span.in_scope(|| tracing::error!(%category, "Research failed: {}", e));
                ExecutionOutcome::Failure(Failure::new(category, e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .field("rules", &self.rules)
            .field("observability", &self.observability)
            .finish_non_exhaustive()
    }
}

/// Holds the pipeline in `Processing` and returns it to `Idle` on drop,
/// including when the submit future is dropped mid-call.
struct ProcessingGuard<'a> {
    state: &'a watch::Sender<PipelineState>,
}

impl<'a> ProcessingGuard<'a> {
    fn enter(state: &'a watch::Sender<PipelineState>) -> Self {
        transition(state, PipelineState::Processing);
        Self { state }
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        transition(self.state, PipelineState::Idle);
    }
}

fn transition(state: &watch::Sender<PipelineState>, to: PipelineState) {
    let from = *state.borrow();
    if let Err(e) = validate_transition(from, to) {
        tracing::error!("Pipeline state out of sync: {}", e);
    }
    state.send_replace(to);
}
