use thiserror::Error;

/// Errors from table mutation operations.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A create-mode writer needs a schema with at least one primary-key
    /// column.
    #[error("schema does not contain a primary key")]
    NoPrimaryKey,

    /// Update and replace writers require the table to exist.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// The schema definition itself is unusable.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Row encode/decode or primary-key derivation failure.
    #[error("row codec error: {0}")]
    Codec(String),

    /// Failure in the underlying versioned storage.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result alias for table mutation operations.
pub type ImportResult<T> = Result<T, ImportError>;
