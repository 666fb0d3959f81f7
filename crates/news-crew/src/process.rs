//! Subprocess crew runner
//!
//! Launches the crew program once per run and waits for it to exit. There
//! is no timeout: a crew that never exits keeps the caller waiting.

use crate::config::ProcessConfig;
use crate::output::extract_report;
use news_core::{CrewInputs, CrewRunner, ExecutionError};
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable carrying the kickoff inputs as JSON
pub const INPUTS_ENV: &str = "CREW_INPUTS";

#[derive(Debug, Clone)]
pub struct ProcessCrewRunner {
    config: ProcessConfig,
}

impl ProcessCrewRunner {
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    fn command(&self, payload: &str) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .envs(&self.config.env)
            .env(INPUTS_ENV, payload)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait::async_trait]
impl CrewRunner for ProcessCrewRunner {
    async fn invoke(&self, inputs: CrewInputs) -> Result<String, ExecutionError> {
        let payload = serde_json::Value::Object(inputs.to_kickoff_map()).to_string();
        debug!(program = %self.config.program, args = ?self.config.args, "Launching crew program");

        let mut child = self
            .command(&payload)
            .spawn()
            .map_err(|e| ExecutionError::Launch {
                program: self.config.program.clone(),
                message: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A crew that ignores stdin may exit before reading it
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(ExecutionError::Other(format!("failed to send inputs to crew: {e}")));
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecutionError::Other(format!("failed to wait for crew program: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = %output.status, stderr = %stderr, "Crew program failed");
            return Err(ExecutionError::Process {
                code: output.status.code(),
                signal: exit_signal(output.status),
                stderr,
            });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| ExecutionError::InvalidOutput(format!("report is not valid UTF-8: {e}")))?;
        extract_report(&stdout)
    }
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}
