//! Bundle store client
//!
//! Talks to the blob store gateway that holds packaged configuration
//! bundles. Objects are returned as a byte stream; callers must copy the
//! stream to a local file before extracting it.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::{Client, Url};
use runway_core::dto::configuration_version::{PresignRequest, PresignedUrl};

use crate::error::Result;
use crate::{endpoint, handle_response};

/// Non-seekable stream of object bytes
pub type ObjectStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// HTTP client for the blob store gateway
#[derive(Debug, Clone)]
pub struct BundleStoreClient {
    base_url: String,
    client: Client,
}

impl BundleStoreClient {
    /// Create a new bundle store client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the blob store gateway (e.g., "http://localhost:9000")
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<Url> {
        let mut segments = vec![bucket];
        segments.extend(key.split('/'));
        endpoint(&self.base_url, &segments)
    }

    /// Fetch an object as a byte stream
    ///
    /// A missing object surfaces as an API error for which
    /// [`ClientError::is_not_found`](crate::ClientError::is_not_found) holds.
    pub async fn fetch_object(&self, bucket: &str, key: &str) -> Result<ObjectStream> {
        let url = self.object_url(bucket, key)?;
        let response = self.client.get(url).send().await?;
        let response = crate::check_status(response).await?;

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(stream))
    }

    /// Obtain a time-limited pre-signed PUT URL for an object
    ///
    /// # Arguments
    /// * `bucket` - Target bucket
    /// * `key` - Object key the client will upload to
    /// * `lifetime` - How long the URL stays valid
    pub async fn presign_upload(&self, bucket: &str, key: &str, lifetime: Duration) -> Result<String> {
        let url = endpoint(&self.base_url, &["presign"])?;
        let response = self
            .client
            .post(url)
            .json(&PresignRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                method: "PUT".to_string(),
                expires_in: lifetime.as_secs(),
            })
            .send()
            .await?;

        let presigned: PresignedUrl = handle_response(response).await?;
        Ok(presigned.url)
    }
}
