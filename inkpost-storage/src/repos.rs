//! Per-entity repository implementations over a shared session.
//!
//! Reads query the session's connection directly; tracked writes enqueue
//! [`PendingWrite`]s flushed by `save_changes`. List queries that traverse
//! post↔tag relations fetch the parent rows first and then run one tag
//! query per parent (split fetch) instead of a single multiplicative join.

use crate::session::{check_cancel, db_err, ts_from_sql, PendingWrite, SessionInner};
use async_trait::async_trait;
use inkpost_domain::{
    Post, PostRepository, PostTag, PostWithTags, Repository, StoreError, StoreResult, Tag,
    TagRepository, User, UserProfile, UserRepository, UserWithPosts, UserWithProfile,
};
use inkpost_types::{CancelToken, PostId, ProfileId, TagId, UserId};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::sync::Arc;

// ── Row mapping ──────────────────────────────────────────────────

type UserRow = (String, String, Option<String>, Option<String>);
type ProfileRow = (String, String, String, Option<String>, Option<String>);
type PostRow = (String, String, String, Option<String>, Option<String>, String);
type TagRow = (String, String, Option<String>, Option<String>);

fn bad_id(what: &str, raw: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::InvalidData(format!("bad {what} id '{raw}': {e}"))
}

fn user_from_row((id, username, created, updated): UserRow) -> StoreResult<User> {
    Ok(User {
        id: UserId::parse(&id).map_err(|e| bad_id("user", &id, e))?,
        username,
        created_at: ts_from_sql(created)?,
        updated_at: ts_from_sql(updated)?,
    })
}

fn profile_from_row((id, user_id, bio, created, updated): ProfileRow) -> StoreResult<UserProfile> {
    Ok(UserProfile {
        id: ProfileId::parse(&id).map_err(|e| bad_id("profile", &id, e))?,
        user_id: UserId::parse(&user_id).map_err(|e| bad_id("user", &user_id, e))?,
        bio,
        created_at: ts_from_sql(created)?,
        updated_at: ts_from_sql(updated)?,
    })
}

fn tag_from_row((id, name, created, updated): TagRow) -> StoreResult<Tag> {
    Ok(Tag {
        id: TagId::parse(&id).map_err(|e| bad_id("tag", &id, e))?,
        name,
        created_at: ts_from_sql(created)?,
        updated_at: ts_from_sql(updated)?,
    })
}

const SELECT_USER: &str = "SELECT id, username, created_at, updated_at FROM users";
const SELECT_POST_WITH_OWNER: &str = "SELECT p.id, p.title, p.user_id, p.created_at, p.updated_at, u.username
     FROM posts p JOIN users u ON u.id = p.user_id";

fn query_user(conn: &Connection, sql: &str, args: &[&dyn ToSql]) -> StoreResult<Option<User>> {
    let row = conn
        .query_row(sql, args, |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .optional()
        .map_err(db_err)?;
    row.map(user_from_row).transpose()
}

fn load_profile(conn: &Connection, user_id: &UserId) -> StoreResult<Option<UserProfile>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, bio, created_at, updated_at
             FROM user_profiles WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            },
        )
        .optional()
        .map_err(db_err)?;
    row.map(profile_from_row).transpose()
}

fn with_profile(conn: &Connection, user: User) -> StoreResult<UserWithProfile> {
    let profile = load_profile(conn, &user.id)?;
    Ok(UserWithProfile { user, profile })
}

/// Second leg of the split fetch: tags for one post.
fn load_tags_for_post(conn: &Connection, post_id: &PostId) -> StoreResult<Vec<Tag>> {
    let mut stmt = conn
        .prepare(
            "SELECT t.id, t.name, t.created_at, t.updated_at
             FROM tags t JOIN post_tags pt ON pt.tag_id = t.id
             WHERE pt.post_id = ?1
             ORDER BY t.name",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![post_id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .map_err(db_err)?
        .collect::<Result<Vec<TagRow>, _>>()
        .map_err(db_err)?;
    rows.into_iter().map(tag_from_row).collect()
}

/// Runs a posts-with-owner query, then fetches each post's tags separately
/// so one-to-many rows are never multiplied into the parent result.
fn load_posts_where(
    conn: &Connection,
    sql: &str,
    args: &[&dyn ToSql],
) -> StoreResult<Vec<PostWithTags>> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let rows = stmt
        .query_map(args, |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })
        .map_err(db_err)?
        .collect::<Result<Vec<PostRow>, _>>()
        .map_err(db_err)?;

    let mut result = Vec::with_capacity(rows.len());
    for (id, title, user_id, created, updated, username) in rows {
        let post = Post {
            id: PostId::parse(&id).map_err(|e| bad_id("post", &id, e))?,
            title,
            user_id: UserId::parse(&user_id).map_err(|e| bad_id("user", &user_id, e))?,
            created_at: ts_from_sql(created)?,
            updated_at: ts_from_sql(updated)?,
        };
        let tags = load_tags_for_post(conn, &post.id)?;
        result.push(PostWithTags {
            post,
            username,
            tags,
        });
    }
    Ok(result)
}

// ── Users ────────────────────────────────────────────────────────

pub(crate) struct UserRepo {
    inner: Arc<SessionInner>,
}

impl UserRepo {
    pub(crate) fn new(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Repository<User, UserId> for UserRepo {
    async fn get_by_id(&self, id: UserId, cancel: &CancelToken) -> StoreResult<Option<User>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        query_user(
            &conn,
            &format!("{SELECT_USER} WHERE id = ?1"),
            params![id.to_string()],
        )
    }

    async fn add(&self, entity: User, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::InsertUser(entity));
        Ok(())
    }

    async fn add_range(&self, entities: Vec<User>, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        for entity in entities {
            self.inner.enqueue(PendingWrite::InsertUser(entity));
        }
        Ok(())
    }

    async fn update(&self, entity: User, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::UpdateUser(entity));
        Ok(())
    }

    async fn delete(&self, id: UserId, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::DeleteUser(id));
        Ok(())
    }

    async fn delete_all(&self, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::DeleteAllUsers);
        Ok(())
    }

    async fn execute_raw(&self, sql: &str, cancel: &CancelToken) -> StoreResult<usize> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        conn.execute(sql, []).map_err(db_err)
    }
}

#[async_trait]
impl UserRepository for UserRepo {
    async fn get_by_username(
        &self,
        username: &str,
        cancel: &CancelToken,
    ) -> StoreResult<Option<UserWithProfile>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        let user = query_user(
            &conn,
            &format!("{SELECT_USER} WHERE username = ?1"),
            params![username],
        )?;
        user.map(|u| with_profile(&conn, u)).transpose()
    }

    async fn username_exists(&self, username: &str, cancel: &CancelToken) -> StoreResult<bool> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    async fn get_with_profile(
        &self,
        id: UserId,
        cancel: &CancelToken,
    ) -> StoreResult<Option<UserWithProfile>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        let user = query_user(
            &conn,
            &format!("{SELECT_USER} WHERE id = ?1"),
            params![id.to_string()],
        )?;
        user.map(|u| with_profile(&conn, u)).transpose()
    }

    async fn get_all_with_profile(
        &self,
        cancel: &CancelToken,
    ) -> StoreResult<Vec<UserWithProfile>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!("{SELECT_USER} ORDER BY username"))
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map_err(db_err)?
            .collect::<Result<Vec<UserRow>, _>>()
            .map_err(db_err)?;

        let mut result = Vec::with_capacity(rows.len());
        for raw in rows {
            result.push(with_profile(&conn, user_from_row(raw)?)?);
        }
        Ok(result)
    }

    async fn get_with_posts(
        &self,
        id: UserId,
        cancel: &CancelToken,
    ) -> StoreResult<Option<UserWithPosts>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        let Some(user) = query_user(
            &conn,
            &format!("{SELECT_USER} WHERE id = ?1"),
            params![id.to_string()],
        )?
        else {
            return Ok(None);
        };
        let posts = load_posts_where(
            &conn,
            &format!("{SELECT_POST_WITH_OWNER} WHERE p.user_id = ?1 ORDER BY p.created_at"),
            params![id.to_string()],
        )?;
        Ok(Some(UserWithPosts { user, posts }))
    }

    async fn get_profile(
        &self,
        user_id: UserId,
        cancel: &CancelToken,
    ) -> StoreResult<Option<UserProfile>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        load_profile(&conn, &user_id)
    }

    async fn add_profile(&self, profile: UserProfile, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::InsertProfile(profile));
        Ok(())
    }

    async fn update_profile(&self, profile: UserProfile, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::UpdateProfile(profile));
        Ok(())
    }
}

// ── Posts ────────────────────────────────────────────────────────

pub(crate) struct PostRepo {
    inner: Arc<SessionInner>,
}

impl PostRepo {
    pub(crate) fn new(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Repository<Post, PostId> for PostRepo {
    async fn get_by_id(&self, id: PostId, cancel: &CancelToken) -> StoreResult<Option<Post>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, title, user_id, created_at, updated_at FROM posts WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(|(id, title, user_id, created, updated)| {
            Ok(Post {
                id: PostId::parse(&id).map_err(|e| bad_id("post", &id, e))?,
                title,
                user_id: UserId::parse(&user_id).map_err(|e| bad_id("user", &user_id, e))?,
                created_at: ts_from_sql(created)?,
                updated_at: ts_from_sql(updated)?,
            })
        })
        .transpose()
    }

    async fn add(&self, entity: Post, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::InsertPost(entity));
        Ok(())
    }

    async fn add_range(&self, entities: Vec<Post>, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        for entity in entities {
            self.inner.enqueue(PendingWrite::InsertPost(entity));
        }
        Ok(())
    }

    async fn update(&self, entity: Post, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::UpdatePost(entity));
        Ok(())
    }

    async fn delete(&self, id: PostId, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::DeletePost(id));
        Ok(())
    }

    async fn delete_all(&self, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::DeleteAllPosts);
        Ok(())
    }

    async fn execute_raw(&self, sql: &str, cancel: &CancelToken) -> StoreResult<usize> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        conn.execute(sql, []).map_err(db_err)
    }
}

#[async_trait]
impl PostRepository for PostRepo {
    async fn get_with_tags(
        &self,
        id: PostId,
        cancel: &CancelToken,
    ) -> StoreResult<Option<PostWithTags>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        let mut posts = load_posts_where(
            &conn,
            &format!("{SELECT_POST_WITH_OWNER} WHERE p.id = ?1"),
            params![id.to_string()],
        )?;
        Ok(posts.pop())
    }

    async fn get_all_with_user(&self, cancel: &CancelToken) -> StoreResult<Vec<PostWithTags>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        load_posts_where(
            &conn,
            &format!("{SELECT_POST_WITH_OWNER} ORDER BY p.created_at"),
            &[],
        )
    }

    async fn get_by_user_id(
        &self,
        user_id: UserId,
        cancel: &CancelToken,
    ) -> StoreResult<Vec<PostWithTags>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        load_posts_where(
            &conn,
            &format!("{SELECT_POST_WITH_OWNER} WHERE p.user_id = ?1 ORDER BY p.created_at"),
            params![user_id.to_string()],
        )
    }

    async fn get_by_tag(
        &self,
        tag_name: &str,
        cancel: &CancelToken,
    ) -> StoreResult<Vec<PostWithTags>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        load_posts_where(
            &conn,
            &format!(
                "{SELECT_POST_WITH_OWNER}
                 WHERE p.id IN (
                     SELECT pt.post_id FROM post_tags pt
                     JOIN tags t ON t.id = pt.tag_id
                     WHERE t.name = ?1
                 )
                 ORDER BY p.created_at"
            ),
            params![tag_name],
        )
    }

    async fn add_link(&self, link: PostTag, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::InsertPostTag(link));
        Ok(())
    }
}

// ── Tags ─────────────────────────────────────────────────────────

pub(crate) struct TagRepo {
    inner: Arc<SessionInner>,
}

impl TagRepo {
    pub(crate) fn new(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }

    fn query_tag(conn: &Connection, sql: &str, args: &[&dyn ToSql]) -> StoreResult<Option<Tag>> {
        let row = conn
            .query_row(sql, args, |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()
            .map_err(db_err)?;
        row.map(tag_from_row).transpose()
    }
}

#[async_trait]
impl Repository<Tag, TagId> for TagRepo {
    async fn get_by_id(&self, id: TagId, cancel: &CancelToken) -> StoreResult<Option<Tag>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        Self::query_tag(
            &conn,
            "SELECT id, name, created_at, updated_at FROM tags WHERE id = ?1",
            params![id.to_string()],
        )
    }

    async fn add(&self, entity: Tag, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::InsertTag(entity));
        Ok(())
    }

    async fn add_range(&self, entities: Vec<Tag>, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        for entity in entities {
            self.inner.enqueue(PendingWrite::InsertTag(entity));
        }
        Ok(())
    }

    async fn update(&self, entity: Tag, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::UpdateTag(entity));
        Ok(())
    }

    async fn delete(&self, id: TagId, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::DeleteTag(id));
        Ok(())
    }

    async fn delete_all(&self, cancel: &CancelToken) -> StoreResult<()> {
        check_cancel(cancel)?;
        self.inner.enqueue(PendingWrite::DeleteAllTags);
        Ok(())
    }

    async fn execute_raw(&self, sql: &str, cancel: &CancelToken) -> StoreResult<usize> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        conn.execute(sql, []).map_err(db_err)
    }
}

#[async_trait]
impl TagRepository for TagRepo {
    async fn get_by_name(&self, name: &str, cancel: &CancelToken) -> StoreResult<Option<Tag>> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        Self::query_tag(
            &conn,
            "SELECT id, name, created_at, updated_at FROM tags WHERE name = ?1",
            params![name],
        )
    }

    async fn name_exists(&self, name: &str, cancel: &CancelToken) -> StoreResult<bool> {
        check_cancel(cancel)?;
        let conn = self.inner.conn.lock().unwrap();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )
        .map_err(db_err)
    }
}
