//! Upload notification handler
//!
//! The object store notifies once a bundle lands under
//! `<config-version-id>-<millis>.tar.gz`; the matching configuration version
//! is then marked uploaded.

use runway_core::domain::configuration_version::{ConfigurationStatus, extract_config_version_id};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{EventError, Result};
use crate::store::ConfigurationVersionStore;

/// S3-style object notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<ObjectEventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEventRecord {
    #[serde(default)]
    pub event_source: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
    pub s3: ObjectEventEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEventEntity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

/// Per-record results of an upload notification
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Configuration versions marked uploaded
    pub updated: Vec<String>,
    /// Object keys that could not be processed, with the reason
    pub failed: Vec<(String, EventError)>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Marks the configuration version of every uploaded object as uploaded
///
/// A record that fails does not stop the others.
pub async fn handle_upload_event(
    store: &dyn ConfigurationVersionStore,
    event: &ObjectEvent,
) -> UploadReport {
    let mut report = UploadReport::default();

    for record in &event.records {
        let key = &record.s3.object.key;
        info!(
            "[{} - {}] Bucket = {}, Key = {}",
            record.event_source.as_deref().unwrap_or("-"),
            record.event_time.as_deref().unwrap_or("-"),
            record.s3.bucket.name,
            key
        );

        match mark_uploaded(store, key).await {
            Ok(id) => {
                info!("Set config version={} status to 'uploaded'", id);
                report.updated.push(id);
            }
            Err(e) => {
                error!("Couldn't process object key={}: {}", key, e);
                report.failed.push((key.clone(), e));
            }
        }
    }

    report
}

async fn mark_uploaded(store: &dyn ConfigurationVersionStore, key: &str) -> Result<String> {
    let id = extract_config_version_id(key)?;
    store.update_status(id, ConfigurationStatus::Uploaded).await?;
    Ok(id.to_string())
}
