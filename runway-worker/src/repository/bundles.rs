//! Bundle store repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use runway_client::BundleStoreClient;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// Non-seekable byte stream of a bundle archive
pub type BundleStream = Pin<Box<dyn AsyncRead + Send>>;

/// Repository trait for fetching configuration bundles
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Opens the bundle stored under `key`
    async fn fetch(&self, key: &str) -> Result<BundleStream>;
}

/// Bundle store backed by the blob store gateway
pub struct HttpBundleStore {
    client: BundleStoreClient,
    bucket: String,
}

impl HttpBundleStore {
    /// Creates a new HTTP bundle store
    ///
    /// # Arguments
    /// * `client` - Blob store gateway client
    /// * `bucket` - Bucket holding configuration bundles
    pub fn new(client: BundleStoreClient, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BundleStore for HttpBundleStore {
    async fn fetch(&self, key: &str) -> Result<BundleStream> {
        let stream = self
            .client
            .fetch_object(&self.bucket, key)
            .await
            .with_context(|| format!("Couldn't get object {}:{}", self.bucket, key))?;

        Ok(Box::pin(StreamReader::new(stream)))
    }
}
