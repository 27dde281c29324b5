//! Error types for knowledge graph operations
//!
//! Every schema function and store method returns [`Result`], so callers can
//! tell a missing node from a broken connection or a rejected value.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Operation timed out after {timeout_seconds}s: {context}")]
    TimeoutError {
        timeout_seconds: u64,
        context: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A value was rejected before reaching the database
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A node the operation depends on does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Driver error: {0}")]
    DriverError(#[from] neo4rs::Error),

    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

impl GraphError {
    pub(crate) fn query(context: &str, err: impl std::fmt::Display) -> Self {
        GraphError::QueryError(format!("{}: {}", context, err))
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        GraphError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::SerializationError(e.to_string())
    }
}

impl From<String> for GraphError {
    fn from(s: String) -> Self {
        GraphError::Other(s)
    }
}

impl From<&str> for GraphError {
    fn from(s: &str) -> Self {
        GraphError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GraphError::ConnectionError("Failed to connect".to_string());
        assert_eq!(error.to_string(), "Connection error: Failed to connect");

        let timeout_error = GraphError::TimeoutError {
            timeout_seconds: 5,
            context: "health check".to_string(),
        };
        assert!(timeout_error.to_string().contains("timed out after 5s"));

        let missing = GraphError::not_found("OntologyRule", "rule_7");
        assert_eq!(missing.to_string(), "OntologyRule not found: rule_7");

        let query = GraphError::query("Failed to store debate message", "boom");
        assert_eq!(
            query.to_string(),
            "Query error: Failed to store debate message: boom"
        );
    }

    #[test]
    fn test_error_conversion() {
        let error: GraphError = "test error".into();
        assert!(matches!(error, GraphError::Other(_)));

        let error: GraphError = "test error".to_string().into();
        assert!(matches!(error, GraphError::Other(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: GraphError = json_err.into();
        assert!(matches!(error, GraphError::SerializationError(_)));
    }
}
