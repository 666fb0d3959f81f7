//! HTTP crew runner
//!
//! Posts `{"inputs": <kickoff map>}` to a running crew service. The client
//! is built without a request timeout.

use crate::config::HttpConfig;
use crate::output::extract_report;
use news_core::{CrewInputs, CrewRunner, ExecutionError};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct HttpCrewRunner {
    config: HttpConfig,
    client: reqwest::Client,
}

impl HttpCrewRunner {
    pub fn new(config: HttpConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().unwrap_or_else(|e| {
            warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        });
        Self { config, client }
    }
}

#[async_trait::async_trait]
impl CrewRunner for HttpCrewRunner {
    async fn invoke(&self, inputs: CrewInputs) -> Result<String, ExecutionError> {
        let body = serde_json::json!({ "inputs": inputs.to_kickoff_map() });
        debug!(endpoint = %self.config.endpoint, "Posting kickoff to crew service");

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            warn!(status = %status, "Crew service returned an error");
            return Err(ExecutionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        extract_report(&text)
    }
}

fn map_transport_error(error: reqwest::Error) -> ExecutionError {
    if error.is_connect() || error.is_timeout() {
        ExecutionError::Connection(error_chain(&error))
    } else if error.is_builder() {
        ExecutionError::Other(format!("invalid crew endpoint: {}", error_chain(&error)))
    } else {
        ExecutionError::Other(error_chain(&error))
    }
}

/// reqwest's top-level message hides the cause ("error sending request");
/// include the source chain so classification sees e.g. "Connection refused".
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
