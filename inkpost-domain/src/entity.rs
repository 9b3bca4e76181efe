//! Entity and read-model types.
//!
//! Entities reference each other through foreign-key ids only. Ownership is
//! explicit: a user exclusively owns its profile and posts; posts and tags
//! are jointly referenced, never owned, by [`PostTag`] join rows.
//!
//! Audit timestamps (`created_at` on insert, `updated_at` on modify) are
//! stamped by the persistence layer immediately before each flush. A `None`
//! timestamp means the row has not been persisted (or never modified) yet.

use chrono::{DateTime, Utc};
use inkpost_types::{PostId, ProfileId, TagId, UserId};
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique across the store; 3–50 chars, letters/digits/underscore.
    pub username: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Builds a not-yet-persisted user with a fresh id.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// A user's one-to-one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ProfileId,
    /// Owning user; UNIQUE at the store, so at most one profile per user.
    pub user_id: UserId,
    pub bio: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Builds a not-yet-persisted profile for the given user.
    #[must_use]
    pub fn new(user_id: UserId, bio: impl Into<String>) -> Self {
        Self {
            id: ProfileId::new(),
            user_id,
            bio: bio.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// A post authored by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub user_id: UserId,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Builds a not-yet-persisted post with a fresh id.
    #[must_use]
    pub fn new(title: impl Into<String>, user_id: UserId) -> Self {
        Self {
            id: PostId::new(),
            title: title.into(),
            user_id,
            created_at: None,
            updated_at: None,
        }
    }
}

/// A tag; shared across posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    /// Unique across the store.
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Tag {
    /// Builds a not-yet-persisted tag with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TagId::new(),
            name: name.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Many-to-many link between a post and a tag.
///
/// Keyed by `(post_id, tag_id)`; has no identity of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostTag {
    pub post_id: PostId,
    pub tag_id: TagId,
}

// ── Read models ──────────────────────────────────────────────────

/// A user joined with its optional profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWithProfile {
    pub user: User,
    pub profile: Option<UserProfile>,
}

/// A post joined with its owner's username and its tags.
///
/// Produced by split fetch: the post rows and the tag rows come from
/// separate queries, never one multiplicative join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWithTags {
    pub post: Post,
    pub username: String,
    pub tags: Vec<Tag>,
}

/// A user joined with all of its posts (each with tags).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWithPosts {
    pub user: User,
    pub posts: Vec<PostWithTags>,
}
