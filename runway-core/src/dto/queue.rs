//! Queue gateway DTOs

use serde::{Deserialize, Serialize};

use crate::domain::run::QueueMessage;

/// Long-poll receive request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReceiveMessages {
    pub max_messages: u32,
    pub wait_time_seconds: u32,
}

/// Batch of messages returned by a receive call (possibly empty)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceivedMessages {
    #[serde(default)]
    pub messages: Vec<QueueMessage>,
}
