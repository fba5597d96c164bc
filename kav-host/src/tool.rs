//! Running the external RBAC tools
//!
//! Tools run to completion: there is no timeout and no retry. Standard
//! output is returned as text; anything else is a [`ToolError`].

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Errors that can occur while running a tool
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} could not be started: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed ({status}): {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} produced output that is not valid UTF-8")]
    InvalidOutput { tool: String },
}

impl ToolError {
    /// Name of the tool that failed
    pub fn tool(&self) -> &str {
        match self {
            Self::Spawn { tool, .. } | Self::Failed { tool, .. } | Self::InvalidOutput { tool } => {
                tool
            }
        }
    }

    /// Check if the tool binary could not be found
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// A single tool command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Tool name used in logs and messages
    pub tool: String,
    /// Binary to run
    pub program: PathBuf,
    /// Arguments
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs tool invocations
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run to completion and return standard output
    async fn run(&self, invocation: &ToolInvocation) -> Result<String, ToolError>;
}

/// Runs tools as child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessToolRunner;

impl ProcessToolRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<String, ToolError> {
        tracing::info!(tool = %invocation.tool, "$ {}", invocation);

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                tool: invocation.tool.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(
                tool = %invocation.tool,
                exit_code = ?output.status.code(),
                stderr = %stderr,
                "Tool exited unsuccessfully"
            );
            return Err(ToolError::Failed {
                tool: invocation.tool.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidOutput {
            tool: invocation.tool.clone(),
        })?;
        tracing::debug!(tool = %invocation.tool, output = %stdout, "Tool output");
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let invocation = ToolInvocation::new("rakkess", "/usr/local/bin/rakkess")
            .arg("--namespace")
            .arg("dev")
            .args(["--output", "ascii-table"]);
        assert_eq!(
            invocation.to_string(),
            "/usr/local/bin/rakkess --namespace dev --output ascii-table"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let invocation = ToolInvocation::new("nope", "kav-test-binary-that-does-not-exist");
        let err = ProcessToolRunner::new().run(&invocation).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.tool(), "nope");
        assert!(err.to_string().starts_with("nope could not be started"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout() {
        let invocation = ToolInvocation::new("sh", "sh").args(["-c", "printf 'NAME GET\\npods yes\\n'"]);
        let stdout = ProcessToolRunner::new().run(&invocation).await.unwrap();
        assert_eq!(stdout, "NAME GET\npods yes\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let invocation = ToolInvocation::new("sh", "sh").args(["-c", "echo forbidden >&2; exit 3"]);
        let err = ProcessToolRunner::new().run(&invocation).await.unwrap_err();

        match err {
            ToolError::Failed { stderr, .. } => assert_eq!(stderr, "forbidden"),
            other => panic!("Expected Failed, got {other:?}"),
        }
    }
}
