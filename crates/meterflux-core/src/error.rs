// crates/meterflux-core/src/error.rs

use std::time::Duration;

use thiserror::Error;

use crate::transport::AdapterAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    InvalidName,
    MissingFile,
    ReadFailure,
}

/// Raised by the payload builder. Never leaves the client.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("import name '{name}' is invalid: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("no file selected")]
    MissingFile,

    #[error("failed to read '{file}': {source}")]
    ReadFailure {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{file}' is {size} bytes, larger than the {limit} byte limit")]
    FileTooLarge { file: String, size: usize, limit: usize },
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::InvalidName { .. } => ValidationErrorKind::InvalidName,
            ValidationError::MissingFile => ValidationErrorKind::MissingFile,
            ValidationError::ReadFailure { .. } | ValidationError::FileTooLarge { .. } => {
                ValidationErrorKind::ReadFailure
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no adapter instance registered at {address}")]
    Unreachable { address: AdapterAddress },

    #[error("adapter {address} disconnected before replying")]
    Disconnected { address: AdapterAddress },

    #[error("adapter {address} did not reply within {}ms", .after.as_millis())]
    Timeout {
        address: AdapterAddress,
        after: Duration,
    },

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Domain-level rejection reported by the backend adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("an import is already in progress")]
    Busy,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Caller-visible failure of one import attempt.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("an import is already in progress")]
    Busy,

    #[error("transport error: {0}")]
    Transport(TransportError),

    #[error("import rejected: {0}")]
    Backend(BackendError),
}

impl From<DispatchError> for ImportError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Busy => ImportError::Busy,
            DispatchError::Transport(err) => ImportError::Transport(err),
            DispatchError::Backend(err) => ImportError::Backend(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
