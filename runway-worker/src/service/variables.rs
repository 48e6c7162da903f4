//! Variable resolution
//!
//! Turns a workspace's variables into the environment handed to the
//! provisioning engine process:
//! - `env` variables are exported under their own key
//! - `terraform` variables are exported as `<prefix><key>` (`TF_VAR_region`)
//! - anything else is logged and skipped
//!
//! Variables are only ever exported into the engine subprocess, never into
//! the worker's own environment.

use runway_core::domain::variable::{Variable, VariableCategory};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::repository::VariableRepository;

/// Environment entries exported for one run
pub type RunEnvironment = HashMap<String, String>;

/// Resolves workspace variables into a [`RunEnvironment`]
pub struct VariableResolver {
    repository: Arc<dyn VariableRepository>,
    prefix: String,
}

impl VariableResolver {
    /// Creates a new variable resolver
    ///
    /// # Arguments
    /// * `repository` - Source of workspace variables
    /// * `prefix` - Prefix applied to provisioning-tool variables
    pub fn new(repository: Arc<dyn VariableRepository>, prefix: String) -> Self {
        Self { repository, prefix }
    }

    /// Resolves and exports the variables of a workspace
    ///
    /// A lookup failure is logged and yields an empty environment: a run
    /// without custom variables can still be meaningful.
    pub async fn resolve(&self, workspace_id: &str) -> RunEnvironment {
        let started = Instant::now();

        let variables = match self.repository.list_variables(workspace_id).await {
            Ok(variables) => variables,
            Err(e) => {
                warn!(
                    "Could not retrieve variables for workspace {}, continuing without: {:#}",
                    workspace_id, e
                );
                return RunEnvironment::new();
            }
        };

        info!(
            "Retrieved {} variables for workspace {} in {} ms",
            variables.len(),
            workspace_id,
            started.elapsed().as_millis()
        );

        export_variables(&variables, &self.prefix)
    }
}

/// Builds the environment entries for a set of variables
///
/// Produces exactly one entry per `env` or `terraform` variable. When two
/// variables map to the same entry, the first one retrieved is kept and the
/// duplicate is logged.
pub fn export_variables(variables: &[Variable], prefix: &str) -> RunEnvironment {
    let mut env = RunEnvironment::new();

    for variable in variables {
        let name = match &variable.category {
            VariableCategory::Environment => variable.key.clone(),
            VariableCategory::ProvisioningTool => format!("{}{}", prefix, variable.key),
            VariableCategory::Unknown(category) => {
                warn!(
                    "Unexpected variable category='{}' for variable {}, skipping",
                    category, variable.id
                );
                continue;
            }
        };

        match env.entry(name) {
            Entry::Occupied(entry) => {
                warn!(
                    "Duplicate variable {} ignored (variable {})",
                    entry.key(),
                    variable.id
                );
            }
            Entry::Vacant(entry) => {
                if variable.sensitive {
                    debug!("Exporting {} (sensitive)", entry.key());
                } else {
                    debug!("Exporting {}", entry.key());
                }
                entry.insert(variable.value.clone());
            }
        }
    }

    env
}
