//! Application pipeline for Inkpost.
//!
//! Requests flow through a [`Dispatcher`]: each request type has exactly
//! one registered [`Handler`], and an ordered chain of [`Behavior`]s wraps
//! every dispatch. The [`TransactionBehavior`] brackets writes in a
//! transaction when the request is classified transactional — by explicit
//! marker, or by the `*Command` naming convention.
//!
//! Handlers return [`Outcome`]: business failures (validation, conflicts,
//! missing rows) are values, while infrastructure trouble is [`AppError`].

mod compose;
mod dispatch;
mod dto;
mod error;
mod handlers;
mod outcome;
mod request;
mod transaction;

pub use compose::build_dispatcher;
pub use dispatch::{
    Behavior, Dispatcher, DispatcherBuilder, Handler, Next, RequestContext, RequestInfo,
};
pub use dto::{PostDto, TagDto, UserDto, UserProfileDto};
pub use error::{AppError, AppResult};
pub use handlers::{
    BulkReplaceUsersCommand, BulkReplaceUsersHandler, BulkUser, CreatePostCommand,
    CreatePostHandler, CreateUserCommand, CreateUserHandler, GetAllPostsHandler, GetAllPostsQuery,
    GetAllUsersHandler, GetAllUsersQuery, GetPostByIdHandler, GetPostByIdQuery,
    GetPostsByTagHandler, GetPostsByTagQuery, GetUserByIdHandler, GetUserByIdQuery,
    UpdateUserProfileCommand, UpdateUserProfileHandler,
};
pub use outcome::Outcome;
pub use request::{is_transactional, Request};
pub use transaction::TransactionBehavior;
