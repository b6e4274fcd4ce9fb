//! Error types for query construction, transport and cursor execution

use thiserror::Error;

/// Mistakes made while building a query.
///
/// These are raised before any request is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// `collect` needs alternating name/expression pairs
    #[error("COLLECT expects name/expression pairs, got {len} arguments")]
    OddCollectArguments {
        /// Number of arguments that were passed
        len: usize,
    },

    /// Something other than a query was handed to `nested`
    #[error("Nested expression at position {position} is not a query")]
    NestedNotQuery {
        /// 1-based position inside the nested list
        position: usize,
    },

    /// Neither a collection nor `over()` was given
    #[error("Query has no collection or source expression to iterate over")]
    MissingSource,
}

/// Failures of the underlying HTTP layer, passed through untranslated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Request failed to send
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Failed to read response body
    #[error("Failed to read body: {0}")]
    Body(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

/// Crate-level error.
#[derive(Error, Debug)]
pub enum Error {
    /// The query could not be built
    #[error(transparent)]
    Build(#[from] QueryError),

    /// The server rejected the query or cursor request
    #[error("AQL query failed ({code}, HTTP {status}): {message}")]
    Query {
        /// Server-provided `errorMessage`
        message: String,
        /// Server-provided `errorNum`
        code: i64,
        /// HTTP status of the failing response
        status: u16,
    },

    /// The transport could not complete the request
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with something that is not a cursor response
    #[error("Invalid cursor response: {0}")]
    InvalidResponse(String),

    /// A previous fetch failed; the cursor cannot be resumed
    #[error("Cursor failed earlier and cannot be resumed")]
    CursorFailed,
}

impl Error {
    /// Server error number, if this is a query execution error
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Query { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_display() {
        let err = Error::Query {
            message: "parse error".to_string(),
            code: 1501,
            status: 400,
        };
        let text = err.to_string();
        assert!(text.contains("parse error"));
        assert!(text.contains("1501"));
        assert_eq!(err.code(), Some(1501));
    }

    #[test]
    fn test_build_error_is_transparent() {
        let err: Error = QueryError::OddCollectArguments { len: 3 }.into();
        assert_eq!(
            err.to_string(),
            "COLLECT expects name/expression pairs, got 3 arguments"
        );
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_transport_error_display() {
        assert!(TransportError::Timeout.to_string().contains("timed out"));
        let err = TransportError::Request("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
