use scylla::transport::errors::{NewSessionError, QueryError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Operation timed out: {0}")]
    OperationTimedOut(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid model {model}: {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

impl SchemaError {
    /// True for the client-side timeout kind that schema operations retry on.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SchemaError::OperationTimedOut(_))
    }

    pub(crate) fn invalid_model(model: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidModel {
            model: model.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<QueryError> for SchemaError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::RequestTimeout(msg) => SchemaError::OperationTimedOut(msg),
            QueryError::TimeoutError => {
                SchemaError::OperationTimedOut("driver timeout elapsed".to_string())
            }
            other => SchemaError::DatabaseError(other.to_string()),
        }
    }
}

impl From<NewSessionError> for SchemaError {
    fn from(err: NewSessionError) -> Self {
        SchemaError::ConnectionError(err.to_string())
    }
}
