use prodtrace_blob::BlobError;
use prodtrace_core::ServiceError;
use prodtrace_sql::SQLError;
use thiserror::Error;

/// Failures of the trace pipeline.
///
/// Converted into [`ServiceError`] at the HTTP boundary.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A record with this trace id already exists.
    #[error("trace id '{0}' already exists")]
    DuplicateKey(String),

    /// No record with this trace id.
    #[error("trace record '{0}' not found")]
    NotFound(String),

    /// The code image could not be rendered or written.
    #[error("code image encoding failed: {0}")]
    Encoding(String),

    /// Generic persistence failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Submitted data is unusable.
    #[error("{0}")]
    Validation(String),
}

impl From<SQLError> for TraceError {
    fn from(e: SQLError) -> Self {
        TraceError::Storage(e.to_string())
    }
}

impl From<BlobError> for TraceError {
    fn from(e: BlobError) -> Self {
        TraceError::Encoding(e.to_string())
    }
}

impl From<TraceError> for ServiceError {
    fn from(e: TraceError) -> Self {
        let msg = e.to_string();
        match e {
            TraceError::DuplicateKey(_) => ServiceError::Conflict(msg),
            TraceError::NotFound(_) => ServiceError::NotFound(msg),
            TraceError::Encoding(_) => ServiceError::Encoding(msg),
            TraceError::Storage(_) => ServiceError::Storage(msg),
            TraceError::Validation(_) => ServiceError::Validation(msg),
        }
    }
}
