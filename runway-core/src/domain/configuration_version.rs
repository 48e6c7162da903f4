//! Configuration version domain model
//!
//! A configuration version is created pending, receives a bundle upload
//! through a pre-signed URL, and is marked uploaded once the object store
//! reports the upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of every configuration version identifier
pub const CONFIG_VERSION_ID_PREFIX: &str = "cv-";

/// Suffix of every bundle object key
pub const BUNDLE_KEY_SUFFIX: &str = ".tar.gz";

/// A configuration version record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationVersion {
    pub id: String,
    pub status: ConfigurationStatus,
    pub source: ConfigurationSource,
    pub auto_queue_runs: bool,

    /// Pre-signed upload URL, only meaningful while pending
    pub upload_url: Option<String>,
}

/// Upload status of a configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationStatus {
    Pending,
    Uploaded,
    Errored,
}

impl std::fmt::Display for ConfigurationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationStatus::Pending => write!(f, "pending"),
            ConfigurationStatus::Uploaded => write!(f, "uploaded"),
            ConfigurationStatus::Errored => write!(f, "errored"),
        }
    }
}

/// Where a configuration version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigurationSource {
    #[serde(rename = "tfe-api")]
    Api,
}

/// Errors from object key parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectKeyError {
    #[error("could not extract configuration version id from object key={0}")]
    NoHyphen(String),
}

/// Extracts the configuration version id from a bundle object key
///
/// The id is everything before the last hyphen:
/// `cv-cs1f56el089s714shag0-1728246425601.tar.gz` -> `cv-cs1f56el089s714shag0`
pub fn extract_config_version_id(object_key: &str) -> Result<&str, ObjectKeyError> {
    object_key
        .rfind('-')
        .map(|pos| &object_key[..pos])
        .ok_or_else(|| ObjectKeyError::NoHyphen(object_key.to_string()))
}

/// Builds the time-suffixed object key a bundle is uploaded under
pub fn bundle_object_key(config_version_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}{}",
        config_version_id,
        at.timestamp_millis(),
        BUNDLE_KEY_SUFFIX
    )
}

/// Generates a fresh configuration version identifier
pub fn new_config_version_id() -> String {
    format!(
        "{}{}",
        CONFIG_VERSION_ID_PREFIX,
        uuid::Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_extract_config_version_id() {
        assert_eq!(
            extract_config_version_id("cv-abc123-1700000000000.tar.gz"),
            Ok("cv-abc123")
        );
    }

    #[test]
    fn test_extract_uses_last_hyphen() {
        assert_eq!(
            extract_config_version_id("no-hyphen-at-all-but-has-one"),
            Ok("no-hyphen-at-all-but-has")
        );
    }

    #[test]
    fn test_extract_without_hyphen_fails() {
        assert_eq!(
            extract_config_version_id("archive.tar.gz"),
            Err(ObjectKeyError::NoHyphen("archive.tar.gz".to_string()))
        );
    }

    #[test]
    fn test_bundle_object_key_round_trips_id() {
        let at = Utc.timestamp_millis_opt(1_728_246_425_601).unwrap();
        let key = bundle_object_key("cv-cs1f56el089s714shag0", at);

        assert_eq!(key, "cv-cs1f56el089s714shag0-1728246425601.tar.gz");
        assert_eq!(
            extract_config_version_id(&key),
            Ok("cv-cs1f56el089s714shag0")
        );
    }

    #[test]
    fn test_new_id_has_no_hyphen_after_prefix() {
        let id = new_config_version_id();
        assert!(id.starts_with(CONFIG_VERSION_ID_PREFIX));
        assert!(!id[CONFIG_VERSION_ID_PREFIX.len()..].contains('-'));
    }

    #[test]
    fn test_source_wire_name() {
        assert_eq!(
            serde_json::to_string(&ConfigurationSource::Api).unwrap(),
            "\"tfe-api\""
        );
    }
}
