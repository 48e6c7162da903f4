//! External process execution
//!
//! Every external tool the worker drives (archive extraction, version
//! selection, the provisioning engine) goes through [`ProcessExecutor`], so
//! the adapters can be exercised against a fake executor.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// A single command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, inherited from the worker when `None`
    pub working_dir: Option<PathBuf>,
    /// Variables added on top of the worker's own environment
    pub env: HashMap<String, String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn envs(mut self, env: &HashMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Program and arguments as one line, for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// -1 when the process was terminated by a signal
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors raised before a process could produce an exit code
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Capability to run an external command to completion
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Runs the command and waits for it to exit
    ///
    /// A non-zero exit code is not an error at this level; callers decide
    /// what an exit code means for their tool.
    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput, ProcessError>;
}

/// Executor backed by `tokio::process`
///
/// Children are killed when the returned future is dropped, so a run
/// deadline around the caller also terminates the subprocess.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor;

#[async_trait]
impl ProcessExecutor for CommandExecutor {
    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput, ProcessError> {
        debug!("Executing: {}", invocation.command_line());

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(&invocation.env)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|source| ProcessError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if !output.status.success() {
            debug!(
                "Command failed: cmd={} exit_code={} stderr='{}'",
                invocation.program,
                exit_code,
                stderr.trim()
            );
        } else {
            debug!(
                "Command completed successfully: stdout_len={}, stderr_len={}",
                stdout.len(),
                stderr.len()
            );
        }

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let mut env = HashMap::new();
        env.insert("FOO".to_string(), "bar".to_string());

        let invocation = Invocation::new("terraform")
            .arg("init")
            .arg("-no-color")
            .working_dir("/work")
            .envs(&env);

        assert_eq!(invocation.command_line(), "terraform init -no-color");
        assert_eq!(invocation.working_dir, Some(PathBuf::from("/work")));
        assert_eq!(invocation.env.get("FOO"), Some(&"bar".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_executor_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = HashMap::new();
        env.insert("RUNWAY_TEST_VALUE".to_string(), "hello".to_string());

        let output = CommandExecutor
            .run(
                Invocation::new("sh")
                    .arg("-c")
                    .arg("echo $RUNWAY_TEST_VALUE; pwd; echo oops >&2; exit 3")
                    .working_dir(dir.path())
                    .envs(&env),
            )
            .await
            .unwrap();

        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("hello"));
        assert!(lines.next().is_some());
        assert_eq!(output.stderr.trim(), "oops");
        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = CommandExecutor
            .run(Invocation::new("runway-no-such-binary"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
