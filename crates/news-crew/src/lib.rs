//! News Crew - backends behind the `CrewRunner` boundary
//!
//! The research crew itself (a researcher agent followed by a reporting
//! analyst) is an external program. This crate only knows how to reach it:
//! - `ProcessCrewRunner` launches the crew program per run
//! - `HttpCrewRunner` posts to a running crew service
//!
//! Both hand the crew the same kickoff inputs and extract the report the
//! same way.

#![allow(missing_docs)]

pub mod config;
pub mod http;
pub mod output;
pub mod process;

pub use config::{CrewBackendConfig, HttpConfig, ProcessConfig};
pub use http::HttpCrewRunner;
pub use output::extract_report;
pub use process::{ProcessCrewRunner, INPUTS_ENV};

use news_core::CrewRunner;
use std::sync::Arc;

/// Build the runner for the configured backend
pub fn build_runner(config: &CrewBackendConfig) -> Arc<dyn CrewRunner> {
    match config {
        CrewBackendConfig::Process(process) => Arc::new(ProcessCrewRunner::new(process.clone())),
        CrewBackendConfig::Http(http) => Arc::new(HttpCrewRunner::new(http.clone())),
    }
}
