//! Run-request queue repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use runway_client::ControlPlaneClient;
use runway_core::domain::run::QueueMessage;
use std::sync::Arc;
use std::time::Duration;

/// Repository trait for the run-request queue
#[async_trait]
pub trait RunQueue: Send + Sync {
    /// Receives up to `max_messages` messages, waiting at most `wait_time`
    ///
    /// An empty batch is a normal result.
    async fn receive(&self, max_messages: u32, wait_time: Duration) -> Result<Vec<QueueMessage>>;

    /// Acknowledges (deletes) a message by its receipt handle
    async fn acknowledge(&self, receipt_handle: &str) -> Result<()>;
}

/// Queue repository backed by the control plane's queue gateway
pub struct HttpRunQueue {
    client: Arc<ControlPlaneClient>,
    queue_name: String,
}

impl HttpRunQueue {
    /// Creates a new HTTP queue repository
    ///
    /// # Arguments
    /// * `client` - Control plane client
    /// * `queue_name` - Name of the run-request queue
    pub fn new(client: Arc<ControlPlaneClient>, queue_name: String) -> Self {
        Self { client, queue_name }
    }
}

#[async_trait]
impl RunQueue for HttpRunQueue {
    async fn receive(&self, max_messages: u32, wait_time: Duration) -> Result<Vec<QueueMessage>> {
        let wait_seconds = u32::try_from(wait_time.as_secs()).unwrap_or(u32::MAX);

        self.client
            .receive_messages(&self.queue_name, max_messages, wait_seconds)
            .await
            .with_context(|| format!("Couldn't get messages from queue {}", self.queue_name))
    }

    async fn acknowledge(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message(&self.queue_name, receipt_handle)
            .await
            .with_context(|| format!("Couldn't delete message from queue {}", self.queue_name))
    }
}
