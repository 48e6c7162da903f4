//! Run processor
//!
//! Drives one run request through its stages:
//!
//! ```text
//! Received -> Decoded -> BundleFetched -> BundleExtracted -> EngineVersionSelected
//!          -> VariablesResolved -> EngineInitialized -> (Planned) -> CleanedUp
//! ```
//!
//! Any stage may fail. Bundle fetch, extraction, version selection, engine
//! initialization and plan failures end the run as `Failed`; a variable
//! lookup failure does not. Whatever happens after decoding, the execution
//! environment is cleaned up. Acknowledging the message is the poller's job.

use runway_core::domain::run::{QueueMessage, RunOutcome, RunRequest, RunStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveExtractor, ExtractError};
use crate::config::Config;
use crate::engine::{EngineContext, EngineError, ProvisioningEngine, VersionSwitcher};
use crate::environment::{EnvironmentManager, ExecutionEnvironment};
use crate::process::ProcessExecutor;
use crate::repository::{BundleStore, RunStatusRepository, VariableRepository};
use crate::service::variables::VariableResolver;

/// Stages of the run state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Received,
    Decoded,
    BundleFetched,
    BundleExtracted,
    EngineVersionSelected,
    VariablesResolved,
    EngineInitialized,
    Planned,
    CleanedUp,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStage::Received => "received",
            RunStage::Decoded => "decoded",
            RunStage::BundleFetched => "bundle-fetched",
            RunStage::BundleExtracted => "bundle-extracted",
            RunStage::EngineVersionSelected => "engine-version-selected",
            RunStage::VariablesResolved => "variables-resolved",
            RunStage::EngineInitialized => "engine-initialized",
            RunStage::Planned => "planned",
            RunStage::CleanedUp => "cleaned-up",
        };
        write!(f, "{}", name)
    }
}

/// Reasons a decoded run fails
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to prepare execution environment: {0}")]
    Environment(#[source] std::io::Error),

    #[error("failed to fetch bundle {key}: {reason}")]
    BundleFetch { key: String, reason: String },

    #[error("failed to extract bundle: {0}")]
    Extract(#[from] ExtractError),

    #[error("failed to select engine version {version}: {source}")]
    EngineVersion {
        version: String,
        #[source]
        source: EngineError,
    },

    #[error("engine initialization failed: {0}")]
    EngineInit(#[source] EngineError),

    #[error("engine plan failed: {0}")]
    Plan(#[source] EngineError),

    #[error("run timed out after {0:?}")]
    TimedOut(Duration),
}

/// Processes run requests one at a time
pub struct RunProcessor {
    bundles: Arc<dyn BundleStore>,
    status: Arc<dyn RunStatusRepository>,
    environments: EnvironmentManager,
    variables: VariableResolver,
    switcher: VersionSwitcher,
    engine: ProvisioningEngine,
    run_timeout: Duration,
    plan_enabled: bool,
}

impl RunProcessor {
    /// Creates a run processor from its collaborators
    ///
    /// # Arguments
    /// * `config` - Paths, engine selection and run policies
    /// * `bundles` - Bundle store
    /// * `variables` - Workspace variable source
    /// * `status` - Run status write-back
    /// * `executor` - Runs the version switcher and the engine
    /// * `extractor` - Unpacks bundles
    pub fn new(
        config: &Config,
        bundles: Arc<dyn BundleStore>,
        variables: Arc<dyn VariableRepository>,
        status: Arc<dyn RunStatusRepository>,
        executor: Arc<dyn ProcessExecutor>,
        extractor: Arc<dyn ArchiveExtractor>,
    ) -> Self {
        Self {
            bundles,
            status,
            environments: EnvironmentManager::new(
                config.work_dir.clone(),
                config.download_dir.clone(),
                config.engine_version.clone(),
                extractor,
            ),
            variables: VariableResolver::new(variables, config.variable_prefix.clone()),
            switcher: VersionSwitcher::new(
                executor.clone(),
                config.version_switcher.clone(),
                config.engine_cache_dir.clone(),
                config.engine_binary.clone(),
            ),
            engine: ProvisioningEngine::new(executor),
            run_timeout: config.run_timeout,
            plan_enabled: config.plan_enabled,
        }
    }

    /// Processes one message to a terminal outcome
    ///
    /// Never touches the queue.
    pub async fn process(&self, message: &QueueMessage) -> RunOutcome {
        let started = Instant::now();
        debug!(
            message_id = %message.message_id,
            stage = %RunStage::Received,
            "Message received"
        );

        let request = match RunRequest::decode(&message.body) {
            Ok(request) => request,
            Err(e) => {
                warn!(message_id = %message.message_id, error = %e, "Poison message");
                return RunOutcome::PoisonMessage(e.to_string());
            }
        };

        info!(
            message_id = %message.message_id,
            config_version_id = %request.config_version_id,
            bundle_key = %request.config_bundle_key,
            workspace_id = %request.workspace_id,
            "Processing run"
        );
        self.transition(&request, RunStage::Decoded, started);
        self.report(&request, RunStatus::Running, None).await;

        let result = self.run_in_environment(&request, started).await;

        let outcome = match result {
            Ok(status) => {
                self.report(&request, status, None).await;
                RunOutcome::Succeeded
            }
            Err(e) => {
                error!(
                    config_version_id = %request.config_version_id,
                    error = %e,
                    "Run failed"
                );
                self.report(&request, RunStatus::Errored, Some(e.to_string()))
                    .await;
                RunOutcome::Failed(e.to_string())
            }
        };

        info!(
            config_version_id = %request.config_version_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            outcome = %outcome,
            "Run finished"
        );
        outcome
    }

    /// Acquires the environment, runs the stages under the deadline and
    /// always releases the environment afterwards
    async fn run_in_environment(
        &self,
        request: &RunRequest,
        started: Instant,
    ) -> Result<RunStatus, RunError> {
        let guard = self
            .environments
            .acquire()
            .await
            .map_err(RunError::Environment)?;

        let result = match tokio::time::timeout(
            self.run_timeout,
            self.execute(request, guard.environment(), started),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RunError::TimedOut(self.run_timeout)),
        };

        match guard.release().await {
            Ok(()) => self.transition(request, RunStage::CleanedUp, started),
            Err(e) => warn!(
                config_version_id = %request.config_version_id,
                error = %e,
                "Error while deleting execution environment"
            ),
        }

        result
    }

    async fn execute(
        &self,
        request: &RunRequest,
        environment: &ExecutionEnvironment,
        started: Instant,
    ) -> Result<RunStatus, RunError> {
        let key = &request.config_bundle_key;
        let fetch_failed = |reason: String| RunError::BundleFetch {
            key: key.clone(),
            reason,
        };

        let stream = self
            .bundles
            .fetch(key)
            .await
            .map_err(|e| fetch_failed(format!("{:#}", e)))?;
        let bytes = self
            .environments
            .download(environment, stream)
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;
        debug!(
            config_version_id = %request.config_version_id,
            bytes,
            path = %environment.bundle_path.display(),
            "Bundle downloaded"
        );
        self.transition(request, RunStage::BundleFetched, started);

        self.environments.extract(environment).await?;
        self.transition(request, RunStage::BundleExtracted, started);

        let binary = self
            .switcher
            .select(&environment.engine_version)
            .await
            .map_err(|source| RunError::EngineVersion {
                version: environment.engine_version.clone(),
                source,
            })?;
        self.transition(request, RunStage::EngineVersionSelected, started);

        let run_env = self.variables.resolve(&request.workspace_id).await;
        self.transition(request, RunStage::VariablesResolved, started);

        let ctx = EngineContext {
            working_dir: &environment.root,
            binary: &binary,
            env: &run_env,
        };

        let output = self
            .engine
            .initialize(&ctx)
            .await
            .map_err(RunError::EngineInit)?;
        info!(
            config_version_id = %request.config_version_id,
            output = output.stdout.trim(),
            "Engine init output"
        );
        self.transition(request, RunStage::EngineInitialized, started);

        if !self.plan_enabled {
            return Ok(RunStatus::Initialized);
        }

        let plan = self.engine.plan(&ctx).await.map_err(RunError::Plan)?;
        info!(
            config_version_id = %request.config_version_id,
            has_changes = plan.has_changes,
            "Plan completed"
        );
        debug!(
            config_version_id = %request.config_version_id,
            output = plan.output.stdout.trim(),
            "Engine plan output"
        );
        self.transition(request, RunStage::Planned, started);

        Ok(RunStatus::Planned)
    }

    fn transition(&self, request: &RunRequest, stage: RunStage, started: Instant) {
        info!(
            config_version_id = %request.config_version_id,
            stage = %stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run stage reached"
        );
    }

    /// Status write-back failures never affect the run outcome
    async fn report(&self, request: &RunRequest, status: RunStatus, message: Option<String>) {
        if let Err(e) = self
            .status
            .report(&request.config_version_id, status, message)
            .await
        {
            warn!(
                config_version_id = %request.config_version_id,
                status = %status,
                error = %format!("{:#}", e),
                "Run status not reported"
            );
        }
    }
}
