//! News Core - request pipeline in front of the research crew
//!
//! The one piece of application logic between the user and the crew:
//! - Validates the submitted topic
//! - Builds the session metadata envelope
//! - Invokes the crew once through the `CrewRunner` boundary
//! - Classifies failures into user-facing categories with hints
//! - Tags each run with an optional observability span
//!
//! # Example
//!
//! ```rust,ignore
//! use news_core::prelude::*;
//!
//! # async fn example(runner: std::sync::Arc<dyn CrewRunner>) {
//! let observability = init_observability(&TelemetryConfig::default());
//! let mut pipeline = RequestPipeline::new(runner, observability);
//!
//! match pipeline.submit("Latest developments in large language models", 2025).await {
//!     ExecutionOutcome::Success(report) => println!("{}", report.as_markdown()),
//!     ExecutionOutcome::Failure(failure) => eprintln!("{failure}\n{}", failure.hint()),
//! }
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod classify;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod runner;
pub mod state_machine;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use classify::{ClassificationConfig, ClassificationRule, ErrorClassifier};
pub use error::{ConfigError, ErrorCategory, ExecutionError, TransitionError, ValidationError};
pub use observability::{
    init_observability, NoopObservability, Observability, ObservabilityStatus, Sampler,
    TelemetryConfig, TracingObservability,
};
pub use pipeline::RequestPipeline;
pub use runner::CrewRunner;
pub use state_machine::PipelineState;
pub use types::{
    CrewInputs, ExecutionOutcome, Failure, Report, ReportExport, SessionId, SessionMetadata,
    INTERFACE_TAG,
};
pub use validation::{validate_topic, Topic, TopicRules};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the pipeline
    pub use crate::{
        init_observability, CrewRunner, ErrorCategory, ExecutionError, ExecutionOutcome,
        RequestPipeline, TelemetryConfig, Topic, TopicRules,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
