//! Variable DTOs (JSON:API)

use serde::{Deserialize, Serialize};

use crate::domain::variable::{Variable, VariableCategory};

/// One page of `GET /api/workspaces/{id}/vars`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariablePage {
    pub data: Vec<VariableResource>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl VariablePage {
    /// Page number to request next, `None` on the last page
    pub fn next_page(&self) -> Option<u32> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.pagination.as_ref())
            .and_then(|pagination| pagination.next_page)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Pagination {
    pub current_page: u32,
    #[serde(default)]
    pub next_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableResource {
    pub id: String,
    pub attributes: VariableAttributes,
    #[serde(default)]
    pub relationships: Option<VariableRelationships>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableAttributes {
    pub key: String,
    /// Write-only sensitive values come back as null
    #[serde(default)]
    pub value: Option<String>,
    pub category: VariableCategory,
    #[serde(default)]
    pub sensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRelationships {
    pub workspace: RelationshipData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipData {
    pub data: ResourceIdentifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl VariableResource {
    /// Converts into the domain type
    ///
    /// `workspace_id` is used when the resource carries no workspace relationship.
    pub fn into_variable(self, workspace_id: &str) -> Variable {
        let workspace_id = self
            .relationships
            .map(|r| r.workspace.data.id)
            .unwrap_or_else(|| workspace_id.to_string());

        Variable {
            id: self.id,
            workspace_id,
            category: self.attributes.category,
            key: self.attributes.key,
            value: self.attributes.value.unwrap_or_default(),
            sensitive: self.attributes.sensitive,
        }
    }
}
