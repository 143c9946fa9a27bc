//! Error types for linnaea.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LinnaeaError>;

/// Errors produced by the codec, store, and search layers.
#[derive(Error, Debug)]
pub enum LinnaeaError {
    /// Payload is not a recognized embedding artifact (bad magic bytes,
    /// invalid UTF-8, inconsistent contents).
    #[error("malformed embedding data: {0}")]
    Format(String),

    /// The artifact declares a format version this build cannot read.
    #[error("unsupported embedding format version {version}")]
    UnsupportedVersion { version: u32 },

    /// The buffer ended before the contents its header declares.
    #[error("truncated embedding data: {context}")]
    TruncatedBuffer { context: String },

    /// Neither the binary nor the textual artifact could be fetched.
    #[error("embedding store unavailable: binary {binary}; textual {textual}")]
    StoreUnavailable { binary: String, textual: String },

    /// Query vector length does not match the collection dimension.
    #[error("query vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An embedding provider call failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// Both the vector path and the keyword fallback failed.
    #[error("search unavailable: vector path failed ({vector}); keyword fallback failed ({keyword})")]
    SearchUnavailable { vector: String, keyword: String },

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LinnaeaError {
    /// Create a format error.
    pub fn format_error(msg: impl Into<String>) -> Self {
        LinnaeaError::Format(msg.into())
    }

    /// Create a truncated-buffer error.
    pub fn truncated(context: impl Into<String>) -> Self {
        LinnaeaError::TruncatedBuffer {
            context: context.into(),
        }
    }

    /// Create a provider error.
    pub fn provider(msg: impl Into<String>) -> Self {
        LinnaeaError::Provider(msg.into())
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        LinnaeaError::InvalidArgument(msg.into())
    }

    /// Whether this failure may be degraded to the keyword fallback.
    ///
    /// Provider and store failures are recoverable. A dimension mismatch is a
    /// configuration bug and must surface to the caller, as must invalid
    /// arguments and an already-exhausted fallback.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            LinnaeaError::DimensionMismatch { .. }
                | LinnaeaError::InvalidArgument(_)
                | LinnaeaError::SearchUnavailable { .. }
        )
    }
}
