use thiserror::Error;

/// Main error type for the lineage service
#[derive(Error, Debug)]
pub enum LineageError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Taxonomy validation or lookup errors
    #[error("Taxonomy error: {0}")]
    Taxonomy(String),

    /// Start node not present in the graph
    #[error("Start node not found: {0}")]
    StartNotFound(String),

    /// Malformed traversal request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller withdrew the request
    #[error("Traversal cancelled")]
    Cancelled,

    /// Graph store failed to respond
    #[error("Graph store error: {0}")]
    Store(String),
}

/// Convenient Result type using LineageError
pub type Result<T> = std::result::Result<T, LineageError>;
