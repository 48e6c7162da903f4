//! Run status repository
//!
//! Writes the outcome of a run back to its configuration version so it is
//! visible beyond the worker's logs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use runway_client::ControlPlaneClient;
use runway_core::domain::run::RunStatus;
use std::sync::Arc;

/// Repository trait for run status write-back
#[async_trait]
pub trait RunStatusRepository: Send + Sync {
    /// Reports the run status of a configuration version
    ///
    /// # Arguments
    /// * `config_version_id` - Configuration version the run belongs to
    /// * `status` - New status
    /// * `message` - Failure detail, if any
    async fn report(
        &self,
        config_version_id: &str,
        status: RunStatus,
        message: Option<String>,
    ) -> Result<()>;
}

/// HTTP implementation of RunStatusRepository
pub struct HttpRunStatusRepository {
    client: Arc<ControlPlaneClient>,
}

impl HttpRunStatusRepository {
    pub fn new(client: Arc<ControlPlaneClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RunStatusRepository for HttpRunStatusRepository {
    async fn report(
        &self,
        config_version_id: &str,
        status: RunStatus,
        message: Option<String>,
    ) -> Result<()> {
        self.client
            .update_run_status(config_version_id, status, message)
            .await
            .with_context(|| {
                format!(
                    "Failed to report run status {} for {}",
                    status, config_version_id
                )
            })
    }
}
