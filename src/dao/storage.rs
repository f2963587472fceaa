use std::error::Error;
use thiserror::Error;

/// Result alias for archive operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by archive backends regardless of the remote service behind them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The archive could not be reached or refused the call.
    #[error("archive unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A document could not be encoded before upload.
    #[error("failed to encode `{name}` for upload")]
    Serialization {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Wrap any backend failure.
    pub fn unavailable(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Encoding failure for the document that would have been stored as `name`.
    pub fn serialization(name: &str, source: serde_json::Error) -> Self {
        StorageError::Serialization {
            name: name.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn unavailable_keeps_message_and_source() {
        let err = StorageError::unavailable(
            "create folder `g1`",
            io::Error::new(io::ErrorKind::TimedOut, "timed out"),
        );
        assert_eq!(err.to_string(), "archive unavailable: create folder `g1`");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("timed out"));
    }
}
