//! Route graph error types.

use std::fmt;

use crate::schedules::StoreError;

/// Errors from a route graph backend.
#[derive(Debug)]
pub enum GraphError {
    /// HTTP request failed (network error, connection refused, etc.)
    Http(reqwest::Error),

    /// Response body was not the expected JSON shape
    Json {
        message: String,
        body: Option<String>,
    },

    /// Server returned an error status code
    ApiError { status: u16, message: String },

    /// The database rejected a statement
    Query { code: String, message: String },

    /// Credentials rejected
    Unauthorized,

    /// The call did not complete within its deadline
    Timeout,

    /// The schedule store backing the in-process graph failed
    Store(StoreError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::Http(e) => write!(f, "HTTP error: {e}"),
            GraphError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            GraphError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            GraphError::Query { code, message } => write!(f, "query failed ({code}): {message}"),
            GraphError::Unauthorized => write!(f, "unauthorized (check graph credentials)"),
            GraphError::Timeout => write!(f, "graph call timed out"),
            GraphError::Store(e) => write!(f, "schedule store error: {e}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphError::Http(e) => Some(e),
            GraphError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        GraphError::Http(err)
    }
}

impl From<StoreError> for GraphError {
    fn from(err: StoreError) -> Self {
        GraphError::Store(err)
    }
}
