//! Configuration version creation
//!
//! Answers a JSON:API create request with a pending configuration version
//! and a pre-signed URL the caller uploads its bundle to.

use chrono::Utc;
use runway_core::domain::configuration_version::{
    ConfigurationSource, ConfigurationStatus, ConfigurationVersion, bundle_object_key,
    new_config_version_id,
};
use runway_core::dto::configuration_version::{
    CONFIGURATION_VERSIONS_TYPE, ConfigurationVersionDocument, CreateConfigurationVersion,
};
use std::time::Duration;
use tracing::{error, info};

use crate::HandlerResponse;
use crate::error::{EventError, Result};
use crate::store::{ConfigurationVersionStore, UploadUrlSigner};

/// Lifetime of a pre-signed upload URL
pub const UPLOAD_URL_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// Parses a JSON:API create request
pub fn parse_create_request(body: &str) -> Result<CreateConfigurationVersion> {
    let request: CreateConfigurationVersion =
        serde_json::from_str(body).map_err(|e| EventError::BadRequest(e.to_string()))?;

    if request.data.kind != CONFIGURATION_VERSIONS_TYPE {
        return Err(EventError::BadRequest(format!(
            "unexpected resource type '{}'",
            request.data.kind
        )));
    }

    Ok(request)
}

/// Handles a create request end to end
///
/// # Returns
/// 200 with the JSON:API document of the new version, 400 for a malformed
/// request, 500 when signing or persisting fails
pub async fn create_configuration_version(
    store: &dyn ConfigurationVersionStore,
    signer: &dyn UploadUrlSigner,
    bucket: &str,
    body: &str,
) -> HandlerResponse {
    info!("Body size = {}", body.len());

    match create(store, signer, bucket, body).await {
        Ok(document) => match serde_json::to_string(&document) {
            Ok(json) => HandlerResponse::ok(json),
            Err(e) => {
                error!("Unable to marshal response payload: {}", e);
                HandlerResponse::error(500, e.to_string())
            }
        },
        Err(e) => {
            error!("{}", e);
            HandlerResponse::error(e.status_code(), e.to_string())
        }
    }
}

async fn create(
    store: &dyn ConfigurationVersionStore,
    signer: &dyn UploadUrlSigner,
    bucket: &str,
    body: &str,
) -> Result<ConfigurationVersionDocument> {
    let request = parse_create_request(body)?;

    let id = new_config_version_id();
    let key = bundle_object_key(&id, Utc::now());
    let upload_url = signer
        .presign_upload(bucket, &key, UPLOAD_URL_LIFETIME)
        .await?;

    let cv = store
        .create(ConfigurationVersion {
            id,
            status: ConfigurationStatus::Pending,
            source: ConfigurationSource::Api,
            auto_queue_runs: request.data.attributes.auto_queue_runs,
            upload_url: Some(upload_url),
        })
        .await?;

    info!("Created configuration version {} awaiting upload to {}", cv.id, key);
    Ok(cv.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryStore, RecordingSigner};
    use runway_core::domain::configuration_version::extract_config_version_id;

    const CREATE_BODY: &str = r#"{"data": {"type": "configuration-versions", "attributes": {"auto-queue-runs": false}}}"#;

    #[tokio::test]
    async fn test_creates_pending_version_with_upload_url() {
        let store = MemoryStore::default();
        let signer = RecordingSigner::default();

        let response =
            create_configuration_version(&store, &signer, "tfc-configuration-files", CREATE_BODY)
                .await;

        assert_eq!(response.status_code, 200);
        let doc: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        let id = doc["data"]["id"].as_str().unwrap();
        assert!(id.starts_with("cv-"));
        assert_eq!(doc["data"]["type"], "configuration-versions");
        assert_eq!(doc["data"]["attributes"]["status"], "pending");
        assert_eq!(doc["data"]["attributes"]["source"], "tfe-api");
        assert_eq!(doc["data"]["attributes"]["auto-queue-runs"], false);

        let signed = signer.signed.lock().unwrap().clone();
        assert_eq!(signed.len(), 1);
        let (bucket, key, lifetime) = &signed[0];
        assert_eq!(bucket, "tfc-configuration-files");
        assert!(key.ends_with(".tar.gz"));
        assert_eq!(extract_config_version_id(key).unwrap(), id);
        assert_eq!(*lifetime, Duration::from_secs(900));
        assert_eq!(
            doc["data"]["attributes"]["upload-url"].as_str().unwrap(),
            format!("https://store.test/{}/{}?signature=abc", bucket, key)
        );

        let records = store.records.lock().unwrap();
        assert_eq!(records[id].status, ConfigurationStatus::Pending);
        assert!(!records[id].auto_queue_runs);
    }

    #[tokio::test]
    async fn test_malformed_request_is_bad_request() {
        let store = MemoryStore::default();
        let signer = RecordingSigner::default();

        for body in [
            "not json",
            r#"{"data": {"type": "configuration-versions", "attributes": {}}}"#,
            r#"{"data": {"type": "workspaces", "attributes": {"auto-queue-runs": true}}}"#,
        ] {
            let response = create_configuration_version(&store, &signer, "b", body).await;
            assert_eq!(response.status_code, 400, "body: {}", body);
        }

        assert!(signer.signed.lock().unwrap().is_empty());
        assert!(store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_server_error() {
        let store = MemoryStore {
            unavailable: true,
            ..Default::default()
        };
        let signer = RecordingSigner::default();

        let response = create_configuration_version(&store, &signer, "b", CREATE_BODY).await;

        assert_eq!(response.status_code, 500);
    }
}
