//! Domain model for Inkpost.
//!
//! Defines the types every other layer depends on:
//! - [`User`], [`UserProfile`], [`Post`], [`Tag`], [`PostTag`] — entities
//!   related by foreign-key ids (no navigation references, no cycles)
//! - read models ([`UserWithProfile`], [`PostWithTags`], [`UserWithPosts`])
//!   returned by the specialized repository lookups
//! - validation rules for user-supplied fields
//! - the storage ports: [`Repository`], the per-entity repository traits,
//!   [`UnitOfWork`], and [`SessionFactory`]
//!
//! The ports are implemented by the storage engine crate and consumed by
//! the application pipeline; this crate owns the contract between them.

mod entity;
mod error;
mod repository;
pub mod validate;

pub use entity::{Post, PostTag, PostWithTags, Tag, User, UserProfile, UserWithPosts, UserWithProfile};
pub use error::{StoreError, StoreResult};
pub use repository::{
    PostRepository, Repository, SessionFactory, TagRepository, UnitOfWork, UserRepository,
};
