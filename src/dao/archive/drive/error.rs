//! Error types shared by the Google Drive archive implementation.

use std::error::Error;

use reqwest::{StatusCode, header::InvalidHeaderValue};
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`DriveDaoError`] failures.
pub type DriveResult<T> = Result<T, DriveDaoError>;

/// Failures that can occur while interacting with Google Drive.
#[derive(Debug, Error)]
pub enum DriveDaoError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build Drive HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// Service-account credentials could not be loaded or exchanged for a token.
    #[error("failed to obtain Drive credentials")]
    Credentials {
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The credentials provider returned no fresh authorization headers.
    #[error("Drive credentials returned no authorization headers")]
    MissingAuthHeaders,
    /// The configured static token cannot be used as a header value.
    #[error("configured Drive access token is not a valid header value")]
    InvalidToken {
        #[source]
        source: InvalidHeaderValue,
    },
    /// A request to a Drive endpoint could not be sent.
    #[error("failed to send Drive request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Drive returned an unexpected status code.
    #[error("unexpected Drive response status {status} for `{path}`: {body}")]
    RequestStatus {
        path: String,
        status: StatusCode,
        body: String,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode Drive response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// File metadata could not be serialized for a multipart upload.
    #[error("failed to serialize Drive metadata for `{name}`")]
    SerializeMetadata {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<DriveDaoError> for StorageError {
    fn from(err: DriveDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
