//! Pipeline error taxonomy.

use inkpost_domain::StoreError;
use thiserror::Error;

/// Infrastructure and configuration failures of the pipeline.
///
/// Business failures never appear here; they travel in
/// [`Outcome::Failure`](crate::Outcome::Failure).
#[derive(Debug, Error)]
pub enum AppError {
    /// No handler was registered for the dispatched request type.
    #[error("no handler registered for request '{0}'")]
    HandlerNotFound(&'static str),

    /// A second handler was registered for a request type.
    #[error("a handler is already registered for request '{0}'")]
    DuplicateHandler(&'static str),

    /// The erased payload crossing the chain was not of the expected type.
    /// Registration is keyed by `TypeId`, so reaching this indicates a bug
    /// in the dispatcher itself.
    #[error("request/response type mismatch for '{0}'")]
    TypeMismatch(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;
