//! User commands and queries.

use crate::dispatch::{Handler, RequestContext};
use crate::dto::UserDto;
use crate::error::{AppError, AppResult};
use crate::outcome::Outcome;
use crate::request::Request;
use async_trait::async_trait;
use inkpost_domain::validate::{validate_bio, validate_username};
use inkpost_domain::{StoreError, User, UserProfile};
use inkpost_types::UserId;
use std::collections::HashSet;

// ── CreateUser ───────────────────────────────────────────────────

/// Registers a new user, optionally with a profile.
#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub username: String,
    pub bio: Option<String>,
}

impl Request for CreateUserCommand {
    type Response = UserDto;
    const NAME: &'static str = "CreateUserCommand";
}

pub struct CreateUserHandler;

#[async_trait]
impl Handler<CreateUserCommand> for CreateUserHandler {
    async fn handle(
        &self,
        request: CreateUserCommand,
        ctx: &RequestContext,
    ) -> AppResult<Outcome<UserDto>> {
        let mut errors = Vec::new();
        if let Err(e) = validate_username(&request.username) {
            errors.push(e);
        }
        if let Some(bio) = &request.bio {
            if let Err(e) = validate_bio(bio) {
                errors.push(e);
            }
        }
        if !errors.is_empty() {
            return Ok(Outcome::failures(errors));
        }

        let users = ctx.uow.users();
        if users
            .username_exists(&request.username, &ctx.cancel)
            .await?
        {
            return Ok(Outcome::failure(format!(
                "Username '{}' already exists.",
                request.username
            )));
        }

        let user = User::new(request.username);
        let user_id = user.id;
        users.add(user, &ctx.cancel).await?;
        if let Some(bio) = request.bio.filter(|b| !b.is_empty()) {
            users
                .add_profile(UserProfile::new(user_id, bio), &ctx.cancel)
                .await?;
        }
        ctx.uow.save_changes(&ctx.cancel).await?;

        let stored = fetch_user(ctx, user_id).await?;
        Ok(Outcome::success(stored))
    }
}

// ── UpdateUserProfile ────────────────────────────────────────────

/// Upserts the profile of an existing user.
#[derive(Debug, Clone)]
pub struct UpdateUserProfileCommand {
    pub user_id: UserId,
    pub bio: String,
}

impl Request for UpdateUserProfileCommand {
    type Response = UserDto;
    const NAME: &'static str = "UpdateUserProfileCommand";
}

pub struct UpdateUserProfileHandler;

#[async_trait]
impl Handler<UpdateUserProfileCommand> for UpdateUserProfileHandler {
    async fn handle(
        &self,
        request: UpdateUserProfileCommand,
        ctx: &RequestContext,
    ) -> AppResult<Outcome<UserDto>> {
        if let Err(e) = validate_bio(&request.bio) {
            return Ok(Outcome::failure(e));
        }

        let users = ctx.uow.users();
        if users
            .get_by_id(request.user_id, &ctx.cancel)
            .await?
            .is_none()
        {
            return Ok(Outcome::failure("User not found."));
        }

        match users.get_profile(request.user_id, &ctx.cancel).await? {
            Some(mut profile) => {
                profile.bio = request.bio;
                users.update_profile(profile, &ctx.cancel).await?;
            }
            None => {
                users
                    .add_profile(UserProfile::new(request.user_id, request.bio), &ctx.cancel)
                    .await?;
            }
        }
        ctx.uow.save_changes(&ctx.cancel).await?;

        let stored = fetch_user(ctx, request.user_id).await?;
        Ok(Outcome::success(stored))
    }
}

// ── BulkReplaceUsers ─────────────────────────────────────────────

/// One replacement row of a bulk replace.
#[derive(Debug, Clone)]
pub struct BulkUser {
    pub username: String,
    pub bio: Option<String>,
}

/// Destructively replaces the entire user table.
///
/// Deletes every existing user (cascading to profiles and posts) and
/// inserts the given replacements, all inside one transaction.
#[derive(Debug, Clone)]
pub struct BulkReplaceUsersCommand {
    pub users: Vec<BulkUser>,
}

impl Request for BulkReplaceUsersCommand {
    type Response = Vec<UserDto>;
    const NAME: &'static str = "BulkReplaceUsersCommand";
}

pub struct BulkReplaceUsersHandler;

#[async_trait]
impl Handler<BulkReplaceUsersCommand> for BulkReplaceUsersHandler {
    async fn handle(
        &self,
        request: BulkReplaceUsersCommand,
        ctx: &RequestContext,
    ) -> AppResult<Outcome<Vec<UserDto>>> {
        if request.users.is_empty() {
            return Ok(Outcome::failure(
                "No users provided for bulk replace operation.",
            ));
        }

        // All checks run before the destructive step.
        let mut errors = Vec::new();
        for input in &request.users {
            if let Err(e) = validate_username(&input.username) {
                errors.push(e);
            }
            if let Some(bio) = &input.bio {
                if let Err(e) = validate_bio(bio) {
                    errors.push(e);
                }
            }
        }
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for input in &request.users {
            if !seen.insert(input.username.as_str()) && !duplicates.contains(&input.username) {
                duplicates.push(input.username.clone());
            }
        }
        if !duplicates.is_empty() {
            errors.push(format!(
                "Duplicate usernames found: {}",
                duplicates.join(", ")
            ));
        }
        if !errors.is_empty() {
            return Ok(Outcome::failures(errors));
        }

        let users = ctx.uow.users();
        // Set-based wipe; foreign keys cascade to profiles and posts.
        users.execute_raw("DELETE FROM users", &ctx.cancel).await?;

        let mut ids = Vec::with_capacity(request.users.len());
        for input in request.users {
            let user = User::new(input.username);
            let user_id = user.id;
            ids.push(user_id);
            users.add(user, &ctx.cancel).await?;
            if let Some(bio) = input.bio.filter(|b| !b.is_empty()) {
                users
                    .add_profile(UserProfile::new(user_id, bio), &ctx.cancel)
                    .await?;
            }
        }
        ctx.uow.save_changes(&ctx.cancel).await?;

        let mut dtos = Vec::with_capacity(ids.len());
        for id in ids {
            dtos.push(fetch_user(ctx, id).await?);
        }
        Ok(Outcome::success(dtos))
    }
}

// ── Queries ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct GetUserByIdQuery {
    pub user_id: UserId,
}

impl Request for GetUserByIdQuery {
    type Response = UserDto;
    const NAME: &'static str = "GetUserByIdQuery";
}

pub struct GetUserByIdHandler;

#[async_trait]
impl Handler<GetUserByIdQuery> for GetUserByIdHandler {
    async fn handle(
        &self,
        request: GetUserByIdQuery,
        ctx: &RequestContext,
    ) -> AppResult<Outcome<UserDto>> {
        match ctx
            .uow
            .users()
            .get_with_profile(request.user_id, &ctx.cancel)
            .await?
        {
            Some(read) => Ok(Outcome::success(read.into())),
            None => Ok(Outcome::failure("User not found.")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetAllUsersQuery;

impl Request for GetAllUsersQuery {
    type Response = Vec<UserDto>;
    const NAME: &'static str = "GetAllUsersQuery";
}

pub struct GetAllUsersHandler;

#[async_trait]
impl Handler<GetAllUsersQuery> for GetAllUsersHandler {
    async fn handle(
        &self,
        _request: GetAllUsersQuery,
        ctx: &RequestContext,
    ) -> AppResult<Outcome<Vec<UserDto>>> {
        let all = ctx.uow.users().get_all_with_profile(&ctx.cancel).await?;
        Ok(Outcome::success(all.into_iter().map(Into::into).collect()))
    }
}

/// Re-reads a user after a flush so the DTO carries stamped timestamps.
async fn fetch_user(ctx: &RequestContext, id: UserId) -> AppResult<UserDto> {
    ctx.uow
        .users()
        .get_with_profile(id, &ctx.cancel)
        .await?
        .map(Into::into)
        .ok_or_else(|| {
            AppError::Store(StoreError::NotFound(format!(
                "user {id} missing after flush"
            )))
        })
}
