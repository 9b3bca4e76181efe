//! Cooperative cancellation for request processing.
//!
//! Every repository and unit-of-work operation takes a [`CancelToken`].
//! Persistence steps within one request run strictly sequentially, so
//! cancellation is checked between steps; an operation that observes a
//! cancelled token must not reach commit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A clonable cancellation flag shared between the caller and the pipeline.
///
/// Cloning is cheap; all clones observe the same flag. Once cancelled, a
/// token never becomes active again.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a new, active token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(())` if cancellation has been requested.
    ///
    /// Callers map the unit error into their own error type; the token
    /// crate stays free of error-taxonomy dependencies.
    pub fn ensure_active(&self) -> Result<(), ()> {
        if self.is_cancelled() {
            Err(())
        } else {
            Ok(())
        }
    }
}
