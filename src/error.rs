//! Error types for tierstack

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Observers use this to tell transformer-induced failures apart from
/// failures reported by a level itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    ValueTransformationFailed,
    KeyTransformationFailed,
    Backend,
    Codec,
    Config,
    Internal,
}

/// Errors delivered through the failure channel of a cache request
///
/// Errors are `Clone` because one failure is handed to every observer
/// registered on a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The level holds no value for the requested key
    #[error("Value not found")]
    NotFound,

    /// The forward value transformation returned nothing
    #[error("Value transformation failed")]
    ValueTransformationFailed,

    /// The key could not be mapped onto the wrapped level's key space
    #[error("Key transformation failed")]
    KeyTransformationFailed,

    /// Storage backend error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Encoding or decoding failed
    #[error("{codec} codec failed: {reason}")]
    Codec { codec: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound => ErrorKind::NotFound,
            Error::ValueTransformationFailed => ErrorKind::ValueTransformationFailed,
            Error::KeyTransformationFailed => ErrorKind::KeyTransformationFailed,
            Error::Backend(_) => ErrorKind::Backend,
            Error::Codec { .. } => ErrorKind::Codec,
            Error::Config(_) => ErrorKind::Config,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error was raised by a transformer rather than a level
    pub fn is_transformation_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ValueTransformationFailed | ErrorKind::KeyTransformationFailed
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Backend(err.to_string())
    }
}
