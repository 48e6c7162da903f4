//! Provisioning engine adapter
//!
//! Wraps the external engine binary (`init`, and `plan` when enabled) and
//! the version-selection tool that installs and activates the binary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::process::{Invocation, ProcessError, ProcessExecutor, ProcessOutput};

/// `plan -detailed-exitcode` exits with 2 when the plan has changes
const PLAN_EXIT_CHANGES: i32 = 2;

/// File the plan is saved to, relative to the working directory
pub const PLAN_FILE: &str = "tfplan";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{command} exited with code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("engine binary {0} is missing after version selection")]
    BinaryMissing(PathBuf),

    #[error("failed to inspect engine binary: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured output of an engine command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub stdout: String,
    pub stderr: String,
}

impl From<ProcessOutput> for EngineOutput {
    fn from(output: ProcessOutput) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Result of a successful plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanResult {
    /// Whether the plan proposes any change
    pub has_changes: bool,
    /// Saved plan file, for a later apply or inspection
    pub plan_file: PathBuf,
    pub output: EngineOutput,
}

/// Everything an engine command needs for one run
#[derive(Debug, Clone, Copy)]
pub struct EngineContext<'a> {
    pub working_dir: &'a Path,
    pub binary: &'a Path,
    /// Exported run variables
    pub env: &'a HashMap<String, String>,
}

/// Adapter over the provisioning engine binary
pub struct ProvisioningEngine {
    executor: Arc<dyn ProcessExecutor>,
}

impl ProvisioningEngine {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { executor }
    }

    fn invocation(&self, ctx: &EngineContext<'_>, command: &str) -> Invocation {
        let mut base_env = HashMap::new();
        base_env.insert("TF_IN_AUTOMATION".to_string(), "1".to_string());

        Invocation::new(ctx.binary.to_string_lossy())
            .arg(command)
            .arg("-no-color")
            .arg("-input=false")
            .working_dir(ctx.working_dir)
            .envs(&base_env)
            .envs(ctx.env)
    }

    /// Runs `init` in the run's working directory
    pub async fn initialize(&self, ctx: &EngineContext<'_>) -> Result<EngineOutput, EngineError> {
        let output = self.executor.run(self.invocation(ctx, "init")).await?;

        if !output.success() {
            return Err(EngineError::CommandFailed {
                command: "init".to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output.into())
    }

    /// Runs `plan` after a successful `init`
    ///
    /// Uses `-detailed-exitcode`: 0 means no changes, 2 means changes, any
    /// other code is a failure.
    pub async fn plan(&self, ctx: &EngineContext<'_>) -> Result<PlanResult, EngineError> {
        let invocation = self
            .invocation(ctx, "plan")
            .arg("-detailed-exitcode")
            .arg(format!("-out={}", PLAN_FILE));

        let output = self.executor.run(invocation).await?;

        let has_changes = match output.exit_code {
            0 => false,
            PLAN_EXIT_CHANGES => true,
            exit_code => {
                return Err(EngineError::CommandFailed {
                    command: "plan".to_string(),
                    exit_code,
                    stderr: output.stderr.trim().to_string(),
                });
            }
        };

        Ok(PlanResult {
            has_changes,
            plan_file: ctx.working_dir.join(PLAN_FILE),
            output: output.into(),
        })
    }
}

/// Installs and activates a specific engine version
///
/// Versions are installed into a shared cache directory when one is
/// configured, so repeated runs on the same node download each version once.
/// The cache is append-only and keyed by version; runs are sequential on a
/// worker, so no locking is done.
pub struct VersionSwitcher {
    executor: Arc<dyn ProcessExecutor>,
    program: String,
    cache_dir: Option<PathBuf>,
    binary: PathBuf,
}

impl VersionSwitcher {
    /// Creates a new version switcher
    ///
    /// # Arguments
    /// * `program` - Version-selection tool (e.g. `tfswitch`)
    /// * `cache_dir` - Shared install cache, `None` to use the tool's default
    /// * `binary` - Where the selected binary is linked
    pub fn new(
        executor: Arc<dyn ProcessExecutor>,
        program: String,
        cache_dir: Option<PathBuf>,
        binary: PathBuf,
    ) -> Self {
        Self {
            executor,
            program,
            cache_dir,
            binary,
        }
    }

    /// Ensures `version` is installed and active
    ///
    /// # Returns
    /// Path of the binary to run
    pub async fn select(&self, version: &str) -> Result<PathBuf, EngineError> {
        let mut invocation = Invocation::new(&self.program);
        if let Some(cache_dir) = &self.cache_dir {
            invocation = invocation
                .arg("-i")
                .arg(cache_dir.join("terraform").to_string_lossy());
        }
        let invocation = invocation
            .arg("-b")
            .arg(self.binary.to_string_lossy())
            .arg(version);

        let output = self.executor.run(invocation).await?;
        if !output.success() {
            return Err(EngineError::CommandFailed {
                command: self.program.clone(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        debug!("{} output: {}", self.program, output.stdout.trim());

        if !tokio::fs::try_exists(&self.binary).await? {
            return Err(EngineError::BinaryMissing(self.binary.clone()));
        }

        info!(
            "Selected engine version {} at {}",
            version,
            self.binary.display()
        );
        Ok(self.binary.clone())
    }
}
