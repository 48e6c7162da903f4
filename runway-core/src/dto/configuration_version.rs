//! Configuration version DTOs (JSON:API) and related gateway payloads

use serde::{Deserialize, Serialize};

use crate::domain::configuration_version::{
    ConfigurationSource, ConfigurationStatus, ConfigurationVersion,
};
use crate::domain::run::RunStatus;

/// JSON:API resource type of configuration versions
pub const CONFIGURATION_VERSIONS_TYPE: &str = "configuration-versions";

/// Create request: `{"data": {"type": "configuration-versions", "attributes": {...}}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConfigurationVersion {
    pub data: CreateConfigurationVersionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConfigurationVersionData {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: CreateConfigurationVersionAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateConfigurationVersionAttributes {
    pub auto_queue_runs: bool,
    #[serde(default)]
    pub speculative: bool,
}

/// Single-resource document returned for a configuration version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationVersionDocument {
    pub data: ConfigurationVersionResource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationVersionResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: ConfigurationVersionAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigurationVersionAttributes {
    pub status: ConfigurationStatus,
    pub source: ConfigurationSource,
    pub auto_queue_runs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
}

impl From<ConfigurationVersion> for ConfigurationVersionDocument {
    fn from(cv: ConfigurationVersion) -> Self {
        Self {
            data: ConfigurationVersionResource {
                id: cv.id,
                kind: CONFIGURATION_VERSIONS_TYPE.to_string(),
                attributes: ConfigurationVersionAttributes {
                    status: cv.status,
                    source: cv.source,
                    auto_queue_runs: cv.auto_queue_runs,
                    upload_url: cv.upload_url,
                },
            },
        }
    }
}

impl From<ConfigurationVersionDocument> for ConfigurationVersion {
    fn from(doc: ConfigurationVersionDocument) -> Self {
        let resource = doc.data;
        Self {
            id: resource.id,
            status: resource.attributes.status,
            source: resource.attributes.source,
            auto_queue_runs: resource.attributes.auto_queue_runs,
            upload_url: resource.attributes.upload_url,
        }
    }
}

/// Status-only update: `PATCH /api/configuration-versions/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfigurationStatus {
    pub data: UpdateConfigurationStatusData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfigurationStatusData {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: UpdateConfigurationStatusAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfigurationStatusAttributes {
    pub status: ConfigurationStatus,
}

impl UpdateConfigurationStatus {
    pub fn new(status: ConfigurationStatus) -> Self {
        Self {
            data: UpdateConfigurationStatusData {
                kind: CONFIGURATION_VERSIONS_TYPE.to_string(),
                attributes: UpdateConfigurationStatusAttributes { status },
            },
        }
    }
}

/// Run state write-back for a configuration version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatusUpdate {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request for a pre-signed URL from the blob store gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PresignRequest {
    pub bucket: String,
    pub key: String,
    pub method: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUrl {
    pub url: String,
}
