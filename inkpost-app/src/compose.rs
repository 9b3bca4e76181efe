//! Wires the full pipeline together.

use crate::dispatch::{Dispatcher, DispatcherBuilder};
use crate::error::AppResult;
use crate::handlers::{
    BulkReplaceUsersCommand, BulkReplaceUsersHandler, CreatePostCommand, CreatePostHandler,
    CreateUserCommand, CreateUserHandler, GetAllPostsHandler, GetAllPostsQuery, GetAllUsersHandler,
    GetAllUsersQuery, GetPostByIdHandler, GetPostByIdQuery, GetPostsByTagHandler,
    GetPostsByTagQuery, GetUserByIdHandler, GetUserByIdQuery, UpdateUserProfileCommand,
    UpdateUserProfileHandler,
};
use crate::transaction::TransactionBehavior;
use inkpost_domain::SessionFactory;
use std::sync::Arc;

/// Builds the dispatcher with every handler and the transaction behavior.
///
/// Fails fast on duplicate registrations; a misconfigured pipeline should
/// never start serving.
pub fn build_dispatcher(sessions: Arc<dyn SessionFactory>) -> AppResult<Dispatcher> {
    let builder = DispatcherBuilder::new()
        .handler::<CreateUserCommand, _>(CreateUserHandler)?
        .handler::<UpdateUserProfileCommand, _>(UpdateUserProfileHandler)?
        .handler::<BulkReplaceUsersCommand, _>(BulkReplaceUsersHandler)?
        .handler::<CreatePostCommand, _>(CreatePostHandler)?
        .handler::<GetUserByIdQuery, _>(GetUserByIdHandler)?
        .handler::<GetAllUsersQuery, _>(GetAllUsersHandler)?
        .handler::<GetPostByIdQuery, _>(GetPostByIdHandler)?
        .handler::<GetAllPostsQuery, _>(GetAllPostsHandler)?
        .handler::<GetPostsByTagQuery, _>(GetPostsByTagHandler)?
        // Last-registered behaviors run innermost; the transaction bracket
        // must stay adjacent to the handler, so register it after any other
        // behavior.
        .behavior(TransactionBehavior);
    Ok(builder.build(sessions))
}
