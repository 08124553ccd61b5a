//! Error types for docsql-core.
//!
//! Parse and translation failures are reported synchronously; store failures
//! are wrapped unmodified in [`QueryError::Backend`].

use thiserror::Error;

/// Failure reported by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid collection path: {0}")]
    InvalidPath(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Internal(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Query error type
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Syntax error: query must begin with SELECT")]
    MissingSelect,

    #[error("Syntax error: missing FROM clause")]
    MissingFrom,

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Malformed predicate: {0}")]
    MalformedPredicate(String),

    #[error("Invalid LIMIT: {0}")]
    InvalidLimit(String),

    #[error("Unsupported combination: {0}")]
    UnsupportedCombination(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Backend error: {0}")]
    Backend(#[from] StoreError),
}

impl QueryError {
    /// True for errors raised before any store call was made.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            QueryError::MissingSelect
                | QueryError::MissingFrom
                | QueryError::Syntax(_)
                | QueryError::MalformedPredicate(_)
                | QueryError::InvalidLimit(_)
                | QueryError::UnsupportedCombination(_)
        )
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

impl serde::Serialize for QueryError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            QueryError::MissingSelect.to_string(),
            "Syntax error: query must begin with SELECT"
        );
        assert_eq!(
            QueryError::MissingFrom.to_string(),
            "Syntax error: missing FROM clause"
        );

        let err = QueryError::InvalidLimit("-1".to_string());
        assert_eq!(err.to_string(), "Invalid LIMIT: -1");

        let err = QueryError::UnsupportedOperator("OR".to_string());
        assert_eq!(err.to_string(), "Unsupported operator: OR");

        let err = QueryError::from(StoreError::Unavailable("connection reset".to_string()));
        assert_eq!(
            err.to_string(),
            "Backend error: Store unavailable: connection reset"
        );
    }

    #[test]
    fn test_parse_error_classification() {
        assert!(QueryError::MissingFrom.is_parse_error());
        assert!(QueryError::MalformedPredicate("a".into()).is_parse_error());
        assert!(!QueryError::UnsupportedOperator("OR".into()).is_parse_error());
        assert!(!QueryError::Backend(StoreError::Internal("x".into())).is_parse_error());
    }

    #[test]
    fn test_serialize_as_message() {
        let err = QueryError::Syntax("empty select list".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!("Syntax error: empty select list"));
    }
}
