//! Command and query handlers.

mod posts;
mod users;

pub use posts::{
    CreatePostCommand, CreatePostHandler, GetAllPostsHandler, GetAllPostsQuery,
    GetPostByIdHandler, GetPostByIdQuery, GetPostsByTagHandler, GetPostsByTagQuery,
};
pub use users::{
    BulkReplaceUsersCommand, BulkReplaceUsersHandler, BulkUser, CreateUserCommand,
    CreateUserHandler, GetAllUsersHandler, GetAllUsersQuery, GetUserByIdHandler, GetUserByIdQuery,
    UpdateUserProfileCommand, UpdateUserProfileHandler,
};
