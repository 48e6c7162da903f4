//! Backends the event handlers write to
//!
//! The traits keep the handlers independent of the HTTP clients so they can
//! run against in-memory stores.

use async_trait::async_trait;
use runway_client::{BundleStoreClient, ControlPlaneClient};
use runway_core::domain::configuration_version::{ConfigurationStatus, ConfigurationVersion};
use std::time::Duration;

use crate::error::Result;

/// Keyed record store of configuration versions
#[async_trait]
pub trait ConfigurationVersionStore: Send + Sync {
    /// Persists a new record
    async fn create(&self, cv: ConfigurationVersion) -> Result<ConfigurationVersion>;

    /// Sets the upload status of an existing record
    async fn update_status(&self, id: &str, status: ConfigurationStatus) -> Result<()>;
}

/// Issues time-limited upload URLs for bundle objects
#[async_trait]
pub trait UploadUrlSigner: Send + Sync {
    async fn presign_upload(&self, bucket: &str, key: &str, lifetime: Duration) -> Result<String>;
}

#[async_trait]
impl ConfigurationVersionStore for ControlPlaneClient {
    async fn create(&self, cv: ConfigurationVersion) -> Result<ConfigurationVersion> {
        Ok(self.create_configuration_version(cv).await?)
    }

    async fn update_status(&self, id: &str, status: ConfigurationStatus) -> Result<()> {
        Ok(self.update_configuration_status(id, status).await?)
    }
}

#[async_trait]
impl UploadUrlSigner for BundleStoreClient {
    async fn presign_upload(&self, bucket: &str, key: &str, lifetime: Duration) -> Result<String> {
        Ok(BundleStoreClient::presign_upload(self, bucket, key, lifetime).await?)
    }
}
