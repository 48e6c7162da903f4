//! Workspace variable domain model
//!
//! Variables are managed out of band and are read-only for the worker.

use serde::{Deserialize, Serialize};

/// A single workspace-scoped setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,

    /// Partition key
    pub workspace_id: String,

    pub category: VariableCategory,
    pub key: String,
    pub value: String,

    /// Sensitive values are never written to logs
    pub sensitive: bool,
}

/// How a variable is handed to the provisioning engine
///
/// Unknown categories are kept (with their raw name) so the worker can log
/// and skip them instead of failing the whole variable page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariableCategory {
    /// Exported verbatim by key
    Environment,
    /// Exported with the engine's input-variable prefix
    ProvisioningTool,
    Unknown(String),
}

impl VariableCategory {
    pub fn as_str(&self) -> &str {
        match self {
            VariableCategory::Environment => "env",
            VariableCategory::ProvisioningTool => "terraform",
            VariableCategory::Unknown(raw) => raw,
        }
    }
}

impl From<String> for VariableCategory {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "env" => VariableCategory::Environment,
            "terraform" => VariableCategory::ProvisioningTool,
            _ => VariableCategory::Unknown(raw),
        }
    }
}

impl From<VariableCategory> for String {
    fn from(category: VariableCategory) -> Self {
        category.as_str().to_string()
    }
}

impl std::fmt::Display for VariableCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
