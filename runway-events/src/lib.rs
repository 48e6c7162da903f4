//! Runway Events
//!
//! Handlers around the configuration upload flow:
//!
//! - [`create_configuration_version`]: answers a create request with a
//!   pending configuration version and a pre-signed upload URL
//! - [`handle_upload_event`]: marks a configuration version uploaded when
//!   the object store reports its bundle
//!
//! Both handlers write through the [`ConfigurationVersionStore`] and
//! [`UploadUrlSigner`] traits, implemented by the Runway HTTP clients.

mod create;
pub mod error;
mod store;
mod upload;

pub use create::{UPLOAD_URL_LIFETIME, create_configuration_version, parse_create_request};
pub use error::{EventError, Result};
pub use store::{ConfigurationVersionStore, UploadUrlSigner};
pub use upload::{
    BucketRef, ObjectEvent, ObjectEventEntity, ObjectEventRecord, ObjectRef, UploadReport,
    handle_upload_event,
};

/// Status and body returned by a request-style handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn ok(body: String) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }

    /// Error response with a `{"error": ...}` body
    pub fn error(status_code: u16, message: String) -> Self {
        Self {
            status_code,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }
}
