//! Core type definitions for Inkpost.
//!
//! This crate defines the fundamental, layer-agnostic types used throughout
//! the backend core:
//! - Entity identifiers (UUID v7)
//! - The cooperative cancellation token threaded through every operation
//!
//! Domain entities, repositories, and application logic live in the crates
//! that depend on this one, not here.

mod cancel;
mod ids;

pub use cancel::CancelToken;
pub use ids::{PostId, ProfileId, TagId, UserId};
