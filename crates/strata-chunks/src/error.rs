use thiserror::Error;

/// Errors from the backing engine adapter.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Failure reported by the embedded engine itself.
    #[error("engine error: {0}")]
    Backend(String),

    /// I/O error outside the engine (directory handling and the like).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from chunk store operations.
///
/// Everything here is fatal at this layer: there is no retry policy below
/// the caller. Expected absences (missing chunk, missing root, lost
/// compare-and-swap) are not errors and are encoded in return values
/// instead.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// The store directory could not be created or the engine could not be
    /// opened. Unrecoverable startup failure.
    #[error("failed to open chunk store at {dir}: {reason}")]
    Open { dir: String, reason: String },

    /// Failure propagated from the backing engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The persisted root pointer is not a valid hash encoding.
    #[error("corrupt root pointer: {0}")]
    CorruptRoot(String),

    /// Blob codec failure; on read this means a corrupt chunk payload.
    #[error("blob codec error: {0}")]
    Codec(String),
}

/// Result alias for chunk store operations.
pub type ChunkResult<T> = Result<T, ChunkError>;
