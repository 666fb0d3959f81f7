//! Orchestration boundary
//!
//! The crew is an opaque capability: it takes the kickoff inputs and either
//! returns a markdown document or fails. The pipeline knows nothing else
//! about it.

use crate::error::ExecutionError;
use crate::types::CrewInputs;

/// Crew runner trait
///
/// Implement this trait to connect the pipeline to a crew backend.
/// Implementations must not retry and must not impose their own timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CrewRunner: Send + Sync {
    /// Run the crew once and return its markdown output
    async fn invoke(&self, inputs: CrewInputs) -> Result<String, ExecutionError>;
}
