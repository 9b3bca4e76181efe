//! Storage ports consumed by the application pipeline.
//!
//! The storage engine crate implements these traits; handlers only ever see
//! the trait objects handed out by a [`UnitOfWork`]. One unit of work is
//! bound to one persistence session, and all repositories obtained from it
//! observe the same uncommitted writes.

use crate::entity::{Post, PostTag, PostWithTags, Tag, User, UserProfile, UserWithPosts, UserWithProfile};
use crate::error::StoreResult;
use async_trait::async_trait;
use inkpost_types::{CancelToken, PostId, TagId, UserId};

/// Generic CRUD base shared by every per-entity repository.
///
/// `add`, `add_range`, `update`, and `delete` are tracked: they enqueue
/// pending writes that [`UnitOfWork::save_changes`] flushes to the store.
/// `execute_raw` is a narrow escape hatch for set-based statements (e.g. a
/// bulk delete) that bypass per-row tracking.
#[async_trait]
pub trait Repository<T, Id>: Send + Sync {
    /// Looks up one row by id. Sees uncommitted writes of the session.
    async fn get_by_id(&self, id: Id, cancel: &CancelToken) -> StoreResult<Option<T>>;

    /// Enqueues one insert.
    async fn add(&self, entity: T, cancel: &CancelToken) -> StoreResult<()>;

    /// Enqueues a batch of inserts.
    async fn add_range(&self, entities: Vec<T>, cancel: &CancelToken) -> StoreResult<()>;

    /// Enqueues an update of the row with the entity's id.
    async fn update(&self, entity: T, cancel: &CancelToken) -> StoreResult<()>;

    /// Enqueues a delete of the row with the given id.
    async fn delete(&self, id: Id, cancel: &CancelToken) -> StoreResult<()>;

    /// Enqueues a delete of every row of the entity's table.
    async fn delete_all(&self, cancel: &CancelToken) -> StoreResult<()>;

    /// Executes a raw SQL statement immediately, returning affected rows.
    async fn execute_raw(&self, sql: &str, cancel: &CancelToken) -> StoreResult<usize>;
}

/// User storage port.
#[async_trait]
pub trait UserRepository: Repository<User, UserId> {
    /// Looks up a user (with profile) by exact username.
    async fn get_by_username(
        &self,
        username: &str,
        cancel: &CancelToken,
    ) -> StoreResult<Option<UserWithProfile>>;

    /// Returns whether a user with the given username exists.
    async fn username_exists(&self, username: &str, cancel: &CancelToken) -> StoreResult<bool>;

    /// Looks up a user joined with its optional profile.
    async fn get_with_profile(
        &self,
        id: UserId,
        cancel: &CancelToken,
    ) -> StoreResult<Option<UserWithProfile>>;

    /// Returns all users joined with their profiles.
    async fn get_all_with_profile(&self, cancel: &CancelToken) -> StoreResult<Vec<UserWithProfile>>;

    /// Looks up a user together with its posts and their tags (split fetch).
    async fn get_with_posts(
        &self,
        id: UserId,
        cancel: &CancelToken,
    ) -> StoreResult<Option<UserWithPosts>>;

    /// Looks up just the profile row for a user, if any.
    async fn get_profile(
        &self,
        user_id: UserId,
        cancel: &CancelToken,
    ) -> StoreResult<Option<UserProfile>>;

    /// Enqueues an insert of a new profile row.
    async fn add_profile(&self, profile: UserProfile, cancel: &CancelToken) -> StoreResult<()>;

    /// Enqueues an update of an existing profile row.
    async fn update_profile(&self, profile: UserProfile, cancel: &CancelToken) -> StoreResult<()>;
}

/// Post storage port.
#[async_trait]
pub trait PostRepository: Repository<Post, PostId> {
    /// Looks up one post with its owner's username and tags.
    async fn get_with_tags(
        &self,
        id: PostId,
        cancel: &CancelToken,
    ) -> StoreResult<Option<PostWithTags>>;

    /// Returns all posts with owner usernames and tags (split fetch).
    async fn get_all_with_user(&self, cancel: &CancelToken) -> StoreResult<Vec<PostWithTags>>;

    /// Returns all posts authored by the given user (split fetch).
    async fn get_by_user_id(
        &self,
        user_id: UserId,
        cancel: &CancelToken,
    ) -> StoreResult<Vec<PostWithTags>>;

    /// Returns all posts carrying the given tag name (split fetch).
    async fn get_by_tag(
        &self,
        tag_name: &str,
        cancel: &CancelToken,
    ) -> StoreResult<Vec<PostWithTags>>;

    /// Enqueues an insert of a post↔tag link.
    async fn add_link(&self, link: PostTag, cancel: &CancelToken) -> StoreResult<()>;
}

/// Tag storage port.
#[async_trait]
pub trait TagRepository: Repository<Tag, TagId> {
    /// Looks up a tag by exact name.
    async fn get_by_name(&self, name: &str, cancel: &CancelToken) -> StoreResult<Option<Tag>>;

    /// Returns whether a tag with the given name exists.
    async fn name_exists(&self, name: &str, cancel: &CancelToken) -> StoreResult<bool>;
}

/// One atomic persistence session.
///
/// Owns zero or one open transaction at a time. Dropping the unit of work
/// rolls back any still-open transaction and releases the session.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// User repository bound to this session.
    fn users(&self) -> &dyn UserRepository;

    /// Post repository bound to this session.
    fn posts(&self) -> &dyn PostRepository;

    /// Tag repository bound to this session.
    fn tags(&self) -> &dyn TagRepository;

    /// Flushes pending writes to the store, returning the number of rows
    /// written. May be called multiple times before commit; each flush
    /// stamps audit timestamps on the rows it writes.
    async fn save_changes(&self, cancel: &CancelToken) -> StoreResult<usize>;

    /// Opens a transaction. Fails with [`StoreError::TransactionOpen`] if
    /// one is already open.
    ///
    /// [`StoreError::TransactionOpen`]: crate::StoreError::TransactionOpen
    async fn begin_transaction(&self, cancel: &CancelToken) -> StoreResult<()>;

    /// Commits the open transaction and releases the handle. Without an
    /// open transaction this is a warn-level no-op. A failed commit leaves
    /// the transaction open; callers must roll it back.
    async fn commit_transaction(&self, cancel: &CancelToken) -> StoreResult<()>;

    /// Rolls back the open transaction and releases the handle. Without an
    /// open transaction this is a warn-level no-op; after a failed commit
    /// it reverts the still-open transaction.
    async fn rollback_transaction(&self) -> StoreResult<()>;
}

/// Opens one session per inbound request.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Opens a fresh unit of work against the store.
    async fn open_session(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}
