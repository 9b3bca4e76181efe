//! Sessions, the pending-write buffer, and the unit of work.

use crate::repos::{PostRepo, TagRepo, UserRepo};
use crate::schema::init_schema;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkpost_domain::{
    Post, PostTag, SessionFactory, StoreError, StoreResult, Tag, UnitOfWork, User, UserProfile,
};
use inkpost_types::{CancelToken, PostId, TagId, UserId};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Maps a cancelled token into the storage error taxonomy.
pub(crate) fn check_cancel(cancel: &CancelToken) -> StoreResult<()> {
    cancel.ensure_active().map_err(|()| StoreError::Cancelled)
}

/// Maps a rusqlite error, surfacing constraint violations distinctly.
pub(crate) fn db_err(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Constraint(e.to_string())
        }
        _ => StoreError::Database(e.to_string()),
    }
}

pub(crate) fn ts_to_sql(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

pub(crate) fn ts_from_sql(raw: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    match raw {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| StoreError::InvalidData(format!("bad timestamp '{s}': {e}"))),
    }
}

/// A tracked write waiting for the next `save_changes` flush.
///
/// Order is preserved: a user insert enqueued before its profile insert is
/// flushed first, keeping foreign keys satisfied.
pub(crate) enum PendingWrite {
    InsertUser(User),
    UpdateUser(User),
    DeleteUser(UserId),
    DeleteAllUsers,
    InsertProfile(UserProfile),
    UpdateProfile(UserProfile),
    InsertPost(Post),
    UpdatePost(Post),
    DeletePost(PostId),
    DeleteAllPosts,
    InsertTag(Tag),
    UpdateTag(Tag),
    DeleteTag(TagId),
    DeleteAllTags,
    InsertPostTag(PostTag),
}

impl PendingWrite {
    /// Applies this write to the connection, stamping audit timestamps.
    /// Returns the number of rows affected.
    fn apply(self, conn: &Connection, now: DateTime<Utc>) -> StoreResult<usize> {
        let stamp = Some(now.to_rfc3339());
        let n = match self {
            PendingWrite::InsertUser(u) => conn
                .execute(
                    "INSERT INTO users (id, username, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![u.id.to_string(), u.username, stamp, ts_to_sql(u.updated_at)],
                )
                .map_err(db_err)?,
            PendingWrite::UpdateUser(u) => conn
                .execute(
                    "UPDATE users SET username = ?2, updated_at = ?3 WHERE id = ?1",
                    params![u.id.to_string(), u.username, stamp],
                )
                .map_err(db_err)?,
            PendingWrite::DeleteUser(id) => conn
                .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])
                .map_err(db_err)?,
            PendingWrite::DeleteAllUsers => {
                conn.execute("DELETE FROM users", []).map_err(db_err)?
            }
            PendingWrite::InsertProfile(p) => conn
                .execute(
                    "INSERT INTO user_profiles (id, user_id, bio, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        p.id.to_string(),
                        p.user_id.to_string(),
                        p.bio,
                        stamp,
                        ts_to_sql(p.updated_at)
                    ],
                )
                .map_err(db_err)?,
            PendingWrite::UpdateProfile(p) => conn
                .execute(
                    "UPDATE user_profiles SET bio = ?2, updated_at = ?3 WHERE id = ?1",
                    params![p.id.to_string(), p.bio, stamp],
                )
                .map_err(db_err)?,
            PendingWrite::InsertPost(p) => conn
                .execute(
                    "INSERT INTO posts (id, title, user_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        p.id.to_string(),
                        p.title,
                        p.user_id.to_string(),
                        stamp,
                        ts_to_sql(p.updated_at)
                    ],
                )
                .map_err(db_err)?,
            PendingWrite::UpdatePost(p) => conn
                .execute(
                    "UPDATE posts SET title = ?2, updated_at = ?3 WHERE id = ?1",
                    params![p.id.to_string(), p.title, stamp],
                )
                .map_err(db_err)?,
            PendingWrite::DeletePost(id) => conn
                .execute("DELETE FROM posts WHERE id = ?1", params![id.to_string()])
                .map_err(db_err)?,
            PendingWrite::DeleteAllPosts => {
                conn.execute("DELETE FROM posts", []).map_err(db_err)?
            }
            PendingWrite::InsertTag(t) => conn
                .execute(
                    "INSERT INTO tags (id, name, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![t.id.to_string(), t.name, stamp, ts_to_sql(t.updated_at)],
                )
                .map_err(db_err)?,
            PendingWrite::UpdateTag(t) => conn
                .execute(
                    "UPDATE tags SET name = ?2, updated_at = ?3 WHERE id = ?1",
                    params![t.id.to_string(), t.name, stamp],
                )
                .map_err(db_err)?,
            PendingWrite::DeleteTag(id) => conn
                .execute("DELETE FROM tags WHERE id = ?1", params![id.to_string()])
                .map_err(db_err)?,
            PendingWrite::DeleteAllTags => {
                conn.execute("DELETE FROM tags", []).map_err(db_err)?
            }
            PendingWrite::InsertPostTag(link) => conn
                .execute(
                    "INSERT INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
                    params![link.post_id.to_string(), link.tag_id.to_string()],
                )
                .map_err(db_err)?,
        };
        Ok(n)
    }
}

/// State shared by a unit of work and its repository handles.
pub(crate) struct SessionInner {
    pub(crate) conn: Arc<Mutex<Connection>>,
    pub(crate) pending: Mutex<Vec<PendingWrite>>,
    tx_open: Mutex<bool>,
}

impl SessionInner {
    pub(crate) fn enqueue(&self, write: PendingWrite) {
        self.pending.lock().unwrap().push(write);
    }
}

/// One atomic persistence session over SQLite.
///
/// All three repositories share the session's connection and pending
/// buffer; inside an open transaction they observe each other's flushed
/// writes before commit.
pub struct SqliteUnitOfWork {
    inner: Arc<SessionInner>,
    users: UserRepo,
    posts: PostRepo,
    tags: TagRepo,
}

impl SqliteUnitOfWork {
    fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let inner = Arc::new(SessionInner {
            conn,
            pending: Mutex::new(Vec::new()),
            tx_open: Mutex::new(false),
        });
        Self {
            users: UserRepo::new(Arc::clone(&inner)),
            posts: PostRepo::new(Arc::clone(&inner)),
            tags: TagRepo::new(Arc::clone(&inner)),
            inner,
        }
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    fn users(&self) -> &dyn inkpost_domain::UserRepository {
        &self.users
    }

    fn posts(&self) -> &dyn inkpost_domain::PostRepository {
        &self.posts
    }

    fn tags(&self) -> &dyn inkpost_domain::TagRepository {
        &self.tags
    }

    async fn save_changes(&self, cancel: &CancelToken) -> StoreResult<usize> {
        check_cancel(cancel)?;
        let writes: Vec<PendingWrite> = std::mem::take(&mut *self.inner.pending.lock().unwrap());
        if writes.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let conn = self.inner.conn.lock().unwrap();
        let mut affected = 0;
        for write in writes {
            affected += write.apply(&conn, now)?;
        }
        debug!(rows = affected, "flushed pending writes");
        Ok(affected)
    }

    async fn begin_transaction(&self, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        let mut open = self.inner.tx_open.lock().unwrap();
        if *open {
            return Err(StoreError::TransactionOpen);
        }
        self.inner
            .conn
            .lock()
            .unwrap()
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(db_err)?;
        *open = true;
        Ok(())
    }

    async fn commit_transaction(&self, cancel: &CancelToken) -> StoreResult<()> {
        // A cancelled request must never reach COMMIT.
        check_cancel(cancel)?;
        let mut open = self.inner.tx_open.lock().unwrap();
        if !*open {
            warn!("commit_transaction called with no open transaction");
            return Ok(());
        }
        if !self.inner.pending.lock().unwrap().is_empty() {
            warn!("committing with unflushed pending writes; they will not be persisted");
        }
        self.inner
            .conn
            .lock()
            .unwrap()
            .execute_batch("COMMIT")
            .map_err(db_err)?;
        // A failed COMMIT leaves the transaction open on the connection;
        // the handle stays open too, so rollback (or Drop) still reverts it.
        *open = false;
        Ok(())
    }

    async fn rollback_transaction(&self) -> StoreResult<()> {
        let mut open = self.inner.tx_open.lock().unwrap();
        if !*open {
            warn!("rollback_transaction called with no open transaction");
            return Ok(());
        }
        *open = false;
        self.inner
            .conn
            .lock()
            .unwrap()
            .execute_batch("ROLLBACK")
            .map_err(db_err)
    }
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        let mut open = self.inner.tx_open.lock().unwrap();
        if *open {
            *open = false;
            let conn = self.inner.conn.lock().unwrap();
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!("failed to roll back transaction on session drop: {e}");
            }
        }
    }
}

enum Mode {
    /// Each session opens its own connection to the database file.
    File(PathBuf),
    /// All sessions share one in-memory connection. Intended for tests;
    /// sessions must be used sequentially in this mode.
    Memory(Arc<Mutex<Connection>>),
}

/// Opens one [`SqliteUnitOfWork`] per inbound request.
pub struct SqliteSessionFactory {
    mode: Mode,
}

impl SqliteSessionFactory {
    /// Opens (or creates) the database file and prepares the schema.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let conn = Connection::open(&path)
            .map_err(|e| StoreError::Database(format!("failed to open store: {e}")))?;
        init_schema(&conn)?;
        Ok(Self {
            mode: Mode::File(path),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Database(format!("failed to open in-memory store: {e}")))?;
        init_schema(&conn)?;
        Ok(Self {
            mode: Mode::Memory(Arc::new(Mutex::new(conn))),
        })
    }
}

#[async_trait]
impl SessionFactory for SqliteSessionFactory {
    async fn open_session(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let conn = match &self.mode {
            Mode::File(path) => {
                let conn = Connection::open(path)
                    .map_err(|e| StoreError::Database(format!("failed to open session: {e}")))?;
                init_schema(&conn)?;
                Arc::new(Mutex::new(conn))
            }
            Mode::Memory(shared) => Arc::clone(shared),
        };
        Ok(Box::new(SqliteUnitOfWork::new(conn)))
    }
}
