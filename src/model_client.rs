//! Subprocess invocation of a local model runtime.
//!
//! The prompt is piped to `ollama run <model>` (or whatever command the
//! configuration names) over stdin, and stdout/stderr are captured whole.
//! Transport problems are kept distinct from "the model answered badly":
//! the controller retries both, but the log records them differently.

use derive_more::{Display, Error};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// The model invocation could not be completed.
#[derive(Debug, Display, Error)]
pub enum TransportError {
    /// The runtime process could not be started.
    #[display("failed to spawn {}: {}", command, source)]
    Spawn {
        /// The program that failed to start.
        command: String,
        /// The underlying I/O failure.
        source: std::io::Error,
    },
    /// The prompt could not be written to the child's stdin.
    #[display("failed to write prompt to model stdin: {}", source)]
    Stdin {
        /// The underlying I/O failure.
        source: std::io::Error,
    },
    /// The child did not finish within the configured timeout.
    #[display("model invocation timed out after {}s", secs)]
    Timeout {
        /// The timeout that elapsed.
        secs: u64,
    },
    /// The child's output could not be collected.
    #[display("failed to read model output: {}", source)]
    Read {
        /// The underlying I/O failure.
        source: std::io::Error,
    },
    /// The child exited with a non-zero status.
    #[display("model process exited with status {}", code)]
    Exit {
        /// The exit code, or -1 when terminated by signal.
        code: i32,
        /// Captured stdout, kept for the session log.
        stdout: String,
        /// Captured stderr, kept for the session log.
        stderr: String,
    },
}

/// Captured output of one successful model invocation.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    /// Everything the model wrote to stdout.
    pub stdout: String,
    /// Everything the runtime wrote to stderr.
    pub stderr: String,
}

/// Blocking-style client for a stdin-fed model runtime.
#[derive(Debug, Clone)]
pub struct ModelClient {
    invoke_with: Vec<String>,
    model: String,
    timeout: Duration,
}

impl ModelClient {
    /// Creates a client that runs `invoke_with… <model>` per invocation.
    pub fn new(invoke_with: Vec<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            invoke_with,
            model: model.into(),
            timeout,
        }
    }

    /// The model identifier passed as the final argument.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs the model once with `prompt` on stdin.
    ///
    /// Exactly one invocation is outstanding at a time; the caller awaits
    /// this future before doing anything else. On timeout the child is
    /// killed and [`TransportError::Timeout`] is returned.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn invoke(&self, prompt: &str) -> Result<ModelOutput, TransportError> {
        let program = self
            .invoke_with
            .first()
            .cloned()
            .unwrap_or_else(|| "ollama".to_string());

        debug!(command = %program, "Spawning model runtime");
        let mut command = Command::new(&program);
        command
            .args(self.invoke_with.iter().skip(1))
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            warn!(error = %e, command = %program, "Model runtime failed to start");
            TransportError::Spawn {
                command: program.clone(),
                source: e,
            }
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| TransportError::Stdin { source: e })?;
            // Dropping stdin closes the pipe so the runtime sees EOF.
        }

        debug!(timeout_secs = self.timeout.as_secs(), "Waiting for model output");
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Err(_) => {
                warn!(model = %self.model, "Model invocation timed out");
                return Err(TransportError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
            Ok(Err(e)) => return Err(TransportError::Read { source: e }),
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(code, "Model runtime exited with failure");
            return Err(TransportError::Exit {
                code,
                stdout,
                stderr,
            });
        }

        info!(
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "Model invocation completed"
        );
        Ok(ModelOutput { stdout, stderr })
    }
}
