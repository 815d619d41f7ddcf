//! Schedule store errors.

/// Errors from a schedule backend.
///
/// Every variant is recoverable from the planner's point of view: a failing
/// backend triggers fallback or contributes no candidates.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The database rejected a query or could not be opened
    #[error("database error: {0}")]
    Database(String),

    /// A stored row does not describe a valid schedule or airport
    #[error("corrupt row {id}: {message}")]
    CorruptRow { id: i64, message: String },

    /// The blocking worker running the query panicked or was cancelled
    #[error("store worker failed: {0}")]
    Worker(String),

    /// The call did not complete within its deadline
    #[error("store call timed out")]
    Timeout,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Worker(e.to_string())
    }
}
