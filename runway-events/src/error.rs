//! Event handler errors

use runway_client::ClientError;
use runway_core::domain::configuration_version::ObjectKeyError;
use thiserror::Error;

/// Errors raised by the event handlers
#[derive(Debug, Error)]
pub enum EventError {
    /// The request payload could not be understood
    #[error("Error while parsing request json payload: {0}")]
    BadRequest(String),

    #[error(transparent)]
    ObjectKey(#[from] ObjectKeyError),

    /// The configuration version store or the URL signer failed
    #[error(transparent)]
    Backend(#[from] ClientError),
}

impl EventError {
    /// HTTP status code a request-style handler answers with
    pub fn status_code(&self) -> u16 {
        match self {
            EventError::BadRequest(_) | EventError::ObjectKey(_) => 400,
            EventError::Backend(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, EventError>;
