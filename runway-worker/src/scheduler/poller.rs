//! Run poller
//!
//! Long-polls the run-request queue and processes each received message
//! sequentially, in receive order. A worker runs at most one run at a time
//! because every run owns the same execution root.

use anyhow::{Context, Result};
use runway_core::domain::run::RunOutcome;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{AckPolicy, Config};
use crate::repository::RunQueue;
use crate::service::RunProcessor;

/// Pause after a failed receive before polling again
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// Decides whether a processed message leaves the queue
///
/// Poison messages are always acknowledged: redelivering them can never
/// succeed.
pub fn should_acknowledge(policy: AckPolicy, outcome: &RunOutcome) -> bool {
    match policy {
        AckPolicy::Always => true,
        AckPolicy::SuccessOnly => {
            outcome.is_success() || matches!(outcome, RunOutcome::PoisonMessage(_))
        }
    }
}

/// Run poller that continuously receives and processes run requests
pub struct RunPoller {
    config: Config,
    queue: Arc<dyn RunQueue>,
    processor: Arc<RunProcessor>,
}

impl RunPoller {
    /// Creates a new run poller
    pub fn new(config: Config, queue: Arc<dyn RunQueue>, processor: Arc<RunProcessor>) -> Self {
        Self {
            config,
            queue,
            processor,
        }
    }

    /// Starts the polling loop
    ///
    /// Returns once `shutdown` is cancelled. A run in progress is finished
    /// (and acknowledged per policy) before returning; messages received but
    /// not yet started are left on the queue for redelivery.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Starting run poller on queue {} (max messages: {}, wait: {:?}, ack policy: {:?})",
            self.config.queue_name,
            self.config.max_messages,
            self.config.wait_time,
            self.config.ack_policy
        );

        while !shutdown.is_cancelled() {
            match self.poll_once(&shutdown).await {
                Ok(processed) => {
                    if processed > 0 {
                        info!("Processed {} message(s) this cycle", processed);
                    }
                }
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(RECEIVE_BACKOFF) => {}
                    }
                }
            }
        }

        info!("Run poller stopped");
        Ok(())
    }

    /// Performs a single receive-and-process cycle
    ///
    /// # Returns
    /// Number of messages processed
    pub async fn poll_once(&self, shutdown: &CancellationToken) -> Result<usize> {
        let messages = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(0),
            received = self.queue.receive(self.config.max_messages, self.config.wait_time) => {
                received.context("Failed to receive run requests")?
            }
        };

        if messages.is_empty() {
            debug!("No messages available");
            return Ok(0);
        }

        info!("Received {} message(s)", messages.len());

        let mut processed = 0;
        for message in messages {
            if shutdown.is_cancelled() {
                info!(
                    "Shutdown requested, leaving message {} on the queue",
                    message.message_id
                );
                continue;
            }

            let outcome = self.processor.process(&message).await;
            processed += 1;

            if !should_acknowledge(self.config.ack_policy, &outcome) {
                info!(
                    "Leaving message {} on the queue for redelivery",
                    message.message_id
                );
                continue;
            }

            match self.queue.acknowledge(&message.receipt_handle).await {
                Ok(()) => debug!("Acknowledged message {}", message.message_id),
                Err(e) => warn!(
                    "Failed to acknowledge message {}: {:#}",
                    message.message_id, e
                ),
            }
        }

        Ok(processed)
    }
}
