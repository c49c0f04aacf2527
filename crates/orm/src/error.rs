//! Error types for the ORM system
//!
//! Configuration and argument errors are raised synchronously while a
//! statement is being built or compiled, before anything reaches a
//! [`Connection`](crate::backends::Connection). Connection errors carry the
//! driver's message unmodified.

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Missing or inconsistent metadata: no target model before hydration,
    /// unknown relation, unsupported aggregate function, duplicate select alias,
    /// unresolved relationship table, empty table reference.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The relationship kind does not support the requested operation
    #[error("Unsupported relation: {0}")]
    UnsupportedRelation(String),

    /// Malformed identifier or a value that cannot be bound
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error surfaced by the connection collaborator
    #[error("Connection error: {0}")]
    Connection(String),

    /// Model not found in database
    #[error("Record not found in table '{0}'")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Transaction scope error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Persistence operation not allowed from the entity's current existence state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ModelError {
    /// True for errors raised before any I/O took place
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ModelError::Configuration(_)
                | ModelError::UnsupportedRelation(_)
                | ModelError::InvalidArgument(_)
        )
    }
}

impl From<rusqlite::Error> for ModelError {
    fn from(err: rusqlite::Error) -> Self {
        ModelError::Connection(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
