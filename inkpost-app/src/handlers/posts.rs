//! Post commands and queries.

use crate::dispatch::{Handler, RequestContext};
use crate::dto::PostDto;
use crate::error::{AppError, AppResult};
use crate::outcome::Outcome;
use crate::request::Request;
use async_trait::async_trait;
use inkpost_domain::validate::{validate_tag_name, validate_title};
use inkpost_domain::{Post, PostTag, StoreError, Tag};
use inkpost_types::{PostId, UserId};
use std::collections::HashSet;

// ── CreatePost ───────────────────────────────────────────────────

/// Publishes a post for an existing user, tagging it as it goes.
///
/// Tags are found or created by name. A newly created tag is flushed
/// before its join row is enqueued, so the link's foreign key always has a
/// row to point at; the surrounding transaction keeps the whole request
/// atomic regardless of how many flushes it took.
#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub user_id: UserId,
    pub tags: Vec<String>,
}

impl Request for CreatePostCommand {
    type Response = PostDto;
    const NAME: &'static str = "CreatePostCommand";
}

pub struct CreatePostHandler;

#[async_trait]
impl Handler<CreatePostCommand> for CreatePostHandler {
    async fn handle(
        &self,
        request: CreatePostCommand,
        ctx: &RequestContext,
    ) -> AppResult<Outcome<PostDto>> {
        let mut errors = Vec::new();
        if let Err(e) = validate_title(&request.title) {
            errors.push(e);
        }
        for name in &request.tags {
            if let Err(e) = validate_tag_name(name) {
                errors.push(e);
            }
        }
        if !errors.is_empty() {
            return Ok(Outcome::failures(errors));
        }

        if ctx
            .uow
            .users()
            .get_by_id(request.user_id, &ctx.cancel)
            .await?
            .is_none()
        {
            return Ok(Outcome::failure("User not found."));
        }

        let posts = ctx.uow.posts();
        let post = Post::new(request.title, request.user_id);
        let post_id = post.id;
        posts.add(post, &ctx.cancel).await?;
        ctx.uow.save_changes(&ctx.cancel).await?;

        let mut seen = HashSet::new();
        for name in &request.tags {
            // The same tag twice on one post would violate the link's
            // composite key.
            if !seen.insert(name.as_str()) {
                continue;
            }
            let tag = match ctx.uow.tags().get_by_name(name, &ctx.cancel).await? {
                Some(existing) => existing,
                None => {
                    let tag = Tag::new(name.clone());
                    ctx.uow.tags().add(tag.clone(), &ctx.cancel).await?;
                    ctx.uow.save_changes(&ctx.cancel).await?;
                    tag
                }
            };
            posts
                .add_link(
                    PostTag {
                        post_id,
                        tag_id: tag.id,
                    },
                    &ctx.cancel,
                )
                .await?;
        }
        ctx.uow.save_changes(&ctx.cancel).await?;

        let stored = fetch_post(ctx, post_id).await?;
        Ok(Outcome::success(stored))
    }
}

// ── Queries ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct GetPostByIdQuery {
    pub post_id: PostId,
}

impl Request for GetPostByIdQuery {
    type Response = PostDto;
    const NAME: &'static str = "GetPostByIdQuery";
}

pub struct GetPostByIdHandler;

#[async_trait]
impl Handler<GetPostByIdQuery> for GetPostByIdHandler {
    async fn handle(
        &self,
        request: GetPostByIdQuery,
        ctx: &RequestContext,
    ) -> AppResult<Outcome<PostDto>> {
        match ctx
            .uow
            .posts()
            .get_with_tags(request.post_id, &ctx.cancel)
            .await?
        {
            Some(read) => Ok(Outcome::success(read.into())),
            None => Ok(Outcome::failure("Post not found.")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetAllPostsQuery;

impl Request for GetAllPostsQuery {
    type Response = Vec<PostDto>;
    const NAME: &'static str = "GetAllPostsQuery";
}

pub struct GetAllPostsHandler;

#[async_trait]
impl Handler<GetAllPostsQuery> for GetAllPostsHandler {
    async fn handle(
        &self,
        _request: GetAllPostsQuery,
        ctx: &RequestContext,
    ) -> AppResult<Outcome<Vec<PostDto>>> {
        let all = ctx.uow.posts().get_all_with_user(&ctx.cancel).await?;
        Ok(Outcome::success(all.into_iter().map(Into::into).collect()))
    }
}

/// Posts carrying the given tag name, exact match.
#[derive(Debug, Clone)]
pub struct GetPostsByTagQuery {
    pub tag: String,
}

impl Request for GetPostsByTagQuery {
    type Response = Vec<PostDto>;
    const NAME: &'static str = "GetPostsByTagQuery";
}

pub struct GetPostsByTagHandler;

#[async_trait]
impl Handler<GetPostsByTagQuery> for GetPostsByTagHandler {
    async fn handle(
        &self,
        request: GetPostsByTagQuery,
        ctx: &RequestContext,
    ) -> AppResult<Outcome<Vec<PostDto>>> {
        let hits = ctx
            .uow
            .posts()
            .get_by_tag(&request.tag, &ctx.cancel)
            .await?;
        Ok(Outcome::success(hits.into_iter().map(Into::into).collect()))
    }
}

/// Re-reads a post after a flush so the DTO carries stamped timestamps.
async fn fetch_post(ctx: &RequestContext, id: PostId) -> AppResult<PostDto> {
    ctx.uow
        .posts()
        .get_with_tags(id, &ctx.cancel)
        .await?
        .map(Into::into)
        .ok_or_else(|| {
            AppError::Store(StoreError::NotFound(format!(
                "post {id} missing after flush"
            )))
        })
}
