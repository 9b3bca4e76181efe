//! Response shapes returned by handlers.

use chrono::{DateTime, Utc};
use inkpost_domain::{PostWithTags, UserWithProfile};
use inkpost_types::{PostId, ProfileId, TagId, UserId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfileDto {
    pub id: ProfileId,
    pub user_id: UserId,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDto {
    pub id: UserId,
    pub username: String,
    pub created_at: Option<DateTime<Utc>>,
    pub profile: Option<UserProfileDto>,
}

impl From<UserWithProfile> for UserDto {
    fn from(read: UserWithProfile) -> Self {
        Self {
            id: read.user.id,
            username: read.user.username,
            created_at: read.user.created_at,
            profile: read.profile.map(|p| UserProfileDto {
                id: p.id,
                user_id: p.user_id,
                bio: p.bio,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDto {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDto {
    pub id: PostId,
    pub title: String,
    pub user_id: UserId,
    pub username: String,
    pub created_at: Option<DateTime<Utc>>,
    pub tags: Vec<TagDto>,
}

impl From<PostWithTags> for PostDto {
    fn from(read: PostWithTags) -> Self {
        Self {
            id: read.post.id,
            title: read.post.title,
            user_id: read.post.user_id,
            username: read.username,
            created_at: read.post.created_at,
            tags: read
                .tags
                .into_iter()
                .map(|t| TagDto {
                    id: t.id,
                    name: t.name,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpost_domain::{User, UserProfile};

    #[test]
    fn user_dto_serializes_with_nested_profile() {
        let user = User::new("alice");
        let profile = UserProfile::new(user.id, "hello");
        let dto = UserDto::from(UserWithProfile {
            user,
            profile: Some(profile),
        });

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["profile"]["bio"], "hello");
        assert!(json["created_at"].is_null());
    }

    #[test]
    fn missing_profile_serializes_as_null() {
        let dto = UserDto::from(UserWithProfile {
            user: User::new("bob"),
            profile: None,
        });
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json["profile"].is_null());
    }
}
