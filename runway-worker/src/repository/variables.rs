//! Workspace variable repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use runway_client::ControlPlaneClient;
use runway_core::domain::variable::Variable;
use std::sync::Arc;

/// Repository trait for workspace-scoped variables
#[async_trait]
pub trait VariableRepository: Send + Sync {
    /// Lists every variable of a workspace, across all pages, in retrieval order
    async fn list_variables(&self, workspace_id: &str) -> Result<Vec<Variable>>;
}

/// Variable repository backed by the control plane API
pub struct HttpVariableRepository {
    client: Arc<ControlPlaneClient>,
}

impl HttpVariableRepository {
    pub fn new(client: Arc<ControlPlaneClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VariableRepository for HttpVariableRepository {
    async fn list_variables(&self, workspace_id: &str) -> Result<Vec<Variable>> {
        self.client
            .list_workspace_variables(workspace_id)
            .await
            .with_context(|| format!("Couldn't query variables for workspaceId={}", workspace_id))
    }
}
