//! Run domain types
//!
//! A run is triggered by a message on the run-request queue. The worker
//! decodes the message into a [`RunRequest`], processes it, and produces a
//! [`RunOutcome`] that drives acknowledgment and logging.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoded payload of a run-request message
///
/// Wire format:
/// `{ "configVersionId": ..., "configVersionS3ObjectKey": ..., "workspaceId": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Configuration version being run
    pub config_version_id: String,

    /// Storage key of the packaged configuration bundle
    #[serde(rename = "configVersionS3ObjectKey")]
    pub config_bundle_key: String,

    /// Workspace whose variables and state apply
    pub workspace_id: String,
}

/// Errors produced while decoding a run-request message body
#[derive(Debug, Error)]
pub enum RunRequestError {
    /// The body is not valid JSON or lacks a required field
    #[error("malformed run request: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is present but empty
    #[error("run request field '{0}' is empty")]
    EmptyField(&'static str),
}

impl RunRequest {
    /// Decodes and validates a message body
    ///
    /// All three fields must be present and non-empty. Anything else is a
    /// poison message.
    pub fn decode(body: &str) -> Result<Self, RunRequestError> {
        let request: RunRequest = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<(), RunRequestError> {
        if self.config_version_id.trim().is_empty() {
            return Err(RunRequestError::EmptyField("configVersionId"));
        }
        if self.config_bundle_key.trim().is_empty() {
            return Err(RunRequestError::EmptyField("configVersionS3ObjectKey"));
        }
        if self.workspace_id.trim().is_empty() {
            return Err(RunRequestError::EmptyField("workspaceId"));
        }
        Ok(())
    }
}

/// A message received from the run-request queue
///
/// All three fields are opaque to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QueueMessage {
    pub message_id: String,
    pub body: String,
    pub receipt_handle: String,
}

/// Terminal result of processing one run request
///
/// Not persisted; used to decide acknowledgment and for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed(String),
    PoisonMessage(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Succeeded => write!(f, "succeeded"),
            RunOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            RunOutcome::PoisonMessage(reason) => write!(f, "poison message: {}", reason),
        }
    }
}

/// Run state reported back to the control plane for a configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The worker picked the run up
    Running,
    /// Engine initialization completed
    Initialized,
    /// Plan completed (only when planning is enabled)
    Planned,
    /// The run failed at some stage
    Errored,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Initialized => write!(f, "initialized"),
            RunStatus::Planned => write!(f, "planned"),
            RunStatus::Errored => write!(f, "errored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_recovers_fields() {
        let body = r#"{
            "configVersionId": "cv-abc123",
            "configVersionS3ObjectKey": "cv-abc123-1700000000000.tar.gz",
            "workspaceId": "ws-1"
        }"#;

        let request = RunRequest::decode(body).unwrap();
        assert_eq!(request.config_version_id, "cv-abc123");
        assert_eq!(request.config_bundle_key, "cv-abc123-1700000000000.tar.gz");
        assert_eq!(request.workspace_id, "ws-1");
    }

    #[test]
    fn test_decode_ignores_field_order() {
        let a = r#"{"workspaceId":"ws-1","configVersionS3ObjectKey":"k.tar.gz","configVersionId":"cv-1"}"#;
        let b = r#"{"configVersionId":"cv-1","workspaceId":"ws-1","configVersionS3ObjectKey":"k.tar.gz"}"#;

        assert_eq!(RunRequest::decode(a).unwrap(), RunRequest::decode(b).unwrap());
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let body = r#"{"configVersionId":"cv-1","workspaceId":"ws-1"}"#;
        assert!(matches!(
            RunRequest::decode(body),
            Err(RunRequestError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        assert!(matches!(
            RunRequest::decode("not json"),
            Err(RunRequestError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_field() {
        let body = r#"{"configVersionId":"cv-1","configVersionS3ObjectKey":"","workspaceId":"ws-1"}"#;
        assert!(matches!(
            RunRequest::decode(body),
            Err(RunRequestError::EmptyField("configVersionS3ObjectKey"))
        ));
    }

    #[test]
    fn test_queue_message_wire_format() {
        let json = r#"{"message-id":"m-1","body":"{}","receipt-handle":"r-1"}"#;
        let message: QueueMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.message_id, "m-1");
        assert_eq!(message.receipt_handle, "r-1");
    }

    #[test]
    fn test_run_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Errored).unwrap(),
            "\"errored\""
        );
    }
}
