//! Error types for the storage ports.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// These are infrastructure failures: the pipeline converts them into a
/// rolled-back transaction and propagates them. Expected business failures
/// (duplicate username, missing user) never take this path.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Error reported by the underlying database engine.
    #[error("database error: {0}")]
    Database(String),

    /// A uniqueness or foreign-key constraint was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A row expected to exist was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation observed a cancelled token before completing.
    #[error("operation cancelled")]
    Cancelled,

    /// `begin_transaction` was called while a transaction is already open.
    #[error("a transaction is already open on this session")]
    TransactionOpen,

    /// Invalid data encountered while mapping rows to entities.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
