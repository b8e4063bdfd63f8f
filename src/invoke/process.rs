//! Subprocess function invoker
//!
//! Runs `[runtime] local_path handler` with the event as JSON on stdin. The
//! last non-empty stdout line is the result; everything else the function
//! prints is treated as its log output.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{invocation_timeout, FunctionInvoker, GatewayEvent, GatewayResult, InvocationError};
use crate::config::FunctionRouteConfig;
use crate::logger;

/// Runs each invocation in a fresh child process
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    verbose: bool,
}

impl ProcessInvoker {
    /// With `verbose`, function log output is forwarded to the server log
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn command(config: &FunctionRouteConfig) -> Command {
        let mut command = match &config.runtime {
            Some(runtime) => {
                let mut command = Command::new(runtime);
                command.arg(&config.local_path);
                command
            }
            None => Command::new(program_path(&config.local_path)),
        };

        command
            .arg(&config.handler)
            .envs(&config.environment)
            .env("_HANDLER", &config.handler)
            .env(
                "AWS_LAMBDA_FUNCTION_TIMEOUT",
                config.timeout_in_seconds.to_string(),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl FunctionInvoker for ProcessInvoker {
    async fn invoke(
        &self,
        event: &GatewayEvent,
        config: &FunctionRouteConfig,
    ) -> Result<GatewayResult, InvocationError> {
        let payload = serde_json::to_vec(event).map_err(|e| InvocationError::Io(e.into()))?;

        let mut child = Self::command(config)
            .spawn()
            .map_err(|source| InvocationError::Spawn {
                program: config
                    .runtime
                    .clone()
                    .unwrap_or_else(|| config.local_path.clone()),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or(InvocationError::MissingResult)?;
        let feed = async move {
            let written = stdin.write_all(&payload).await;
            drop(stdin);
            match written {
                // The function may exit without reading its input
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };

        let timeout = invocation_timeout(config);
        let run = async move {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };

        // Dropping `run` on timeout drops the child, which kills it
        let output = tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| InvocationError::Timeout(timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            if self.verbose {
                logger::log_function_output(&config.route_id().to_string(), &stdout);
            }
            return Err(InvocationError::Failed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let (logs, result_line) = split_result_line(&stdout);

        if self.verbose {
            let route = config.route_id().to_string();
            logger::log_function_output(&route, logs);
            logger::log_function_output(&route, &stderr);
        }

        let result_line = result_line.ok_or(InvocationError::MissingResult)?;
        serde_json::from_str(result_line).map_err(InvocationError::InvalidResult)
    }
}

/// Executable path for `local_path`, anchored to the working directory when
/// relative so it is never looked up on `PATH`
fn program_path(local_path: &str) -> PathBuf {
    let path = Path::new(local_path);
    if path.is_relative() && !local_path.starts_with("./") {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

/// Split stdout into the function's log output and its final result line
fn split_result_line(stdout: &str) -> (&str, Option<&str>) {
    let trimmed = stdout.trim_end();
    match trimmed.rfind('\n') {
        Some(idx) => (&trimmed[..idx], Some(trimmed[idx + 1..].trim())),
        None if trimmed.trim().is_empty() => ("", None),
        None => ("", Some(trimmed.trim())),
    }
}
