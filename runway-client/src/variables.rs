//! Workspace variable endpoints

use crate::error::{ClientError, Result};
use crate::{ControlPlaneClient, handle_response};
use runway_core::domain::variable::Variable;
use runway_core::dto::variable::VariablePage;
use tracing::debug;

impl ControlPlaneClient {
    /// List every variable of a workspace
    ///
    /// Follows `meta.pagination.next-page` until the last page and
    /// concatenates the pages in retrieval order. There is no page limit.
    ///
    /// # Arguments
    /// * `workspace_id` - The workspace whose variables are listed
    pub async fn list_workspace_variables(&self, workspace_id: &str) -> Result<Vec<Variable>> {
        let mut variables = Vec::new();
        let mut page_number = 1;

        loop {
            let page = self.variable_page(workspace_id, page_number).await?;
            let next = page.next_page();

            debug!(
                "Fetched variable page {} for workspace {} ({} items)",
                page_number,
                workspace_id,
                page.data.len()
            );

            variables.extend(
                page.data
                    .into_iter()
                    .map(|resource| resource.into_variable(workspace_id)),
            );

            match next {
                Some(next) if next > page_number => page_number = next,
                Some(next) => {
                    return Err(ClientError::InvalidPagination(format!(
                        "next page {} does not advance past page {}",
                        next, page_number
                    )));
                }
                None => return Ok(variables),
            }
        }
    }

    async fn variable_page(&self, workspace_id: &str, page_number: u32) -> Result<VariablePage> {
        let url = self.endpoint(&["api", "workspaces", workspace_id, "vars"])?;
        let response = self
            .client
            .get(url)
            .query(&[("page[number]", page_number)])
            .send()
            .await?;

        handle_response(response).await
    }
}
