//! Runway HTTP Clients
//!
//! Typed HTTP clients for the two services a Runway worker talks to:
//!
//! - [`ControlPlaneClient`]: run-request queue gateway, workspace variables,
//!   configuration version records and run status write-back
//! - [`BundleStoreClient`]: configuration bundle downloads and pre-signed
//!   upload URLs
//!
//! # Example
//!
//! ```no_run
//! use runway_client::ControlPlaneClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ControlPlaneClient::new("http://localhost:8080");
//!
//!     let variables = client.list_workspace_variables("ws-1").await?;
//!     println!("Workspace has {} variables", variables.len());
//!     Ok(())
//! }
//! ```

mod bundles;
mod configuration_versions;
pub mod error;
mod queue;
mod variables;

pub use bundles::{BundleStoreClient, ObjectStream};
pub use error::{ClientError, Result};

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// HTTP client for the Runway control plane API
///
/// Endpoints are grouped by concern:
/// - Queue gateway (receive, acknowledge)
/// - Workspace variables (paged listing)
/// - Configuration versions (create, status updates, run status)
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    /// Base URL of the control plane (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ControlPlaneClient {
    /// Create a new control plane client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the control plane API (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new control plane client with a custom HTTP client
    ///
    /// Long-poll receives hold the connection open for the queue wait time,
    /// so a custom client must not time out before that.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the control plane
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each path segment
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        endpoint(&self.base_url, segments)
    }
}

pub(crate) fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base URL", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Check the status code and deserialize a JSON body
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Check the status code of a response whose body is not needed
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    check_status(response).await.map(|_| ())
}

pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(response)
}
