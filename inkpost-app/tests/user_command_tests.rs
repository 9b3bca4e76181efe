use inkpost_app::{
    build_dispatcher, BulkReplaceUsersCommand, BulkUser, CreateUserCommand, Dispatcher,
    GetAllUsersQuery, GetUserByIdQuery, Outcome, UpdateUserProfileCommand, UserDto,
};
use inkpost_storage::SqliteSessionFactory;
use inkpost_types::UserId;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn make_dispatcher() -> Dispatcher {
    let factory = Arc::new(SqliteSessionFactory::open_in_memory().unwrap());
    build_dispatcher(factory).unwrap()
}

fn make_create(username: &str, bio: Option<&str>) -> CreateUserCommand {
    CreateUserCommand {
        username: username.to_string(),
        bio: bio.map(str::to_string),
    }
}

async fn create_user(dispatcher: &Dispatcher, username: &str) -> UserDto {
    dispatcher
        .send(make_create(username, None))
        .await
        .unwrap()
        .value()
        .unwrap()
}

// ── CreateUser ───────────────────────────────────────────────────

#[tokio::test]
async fn create_user_returns_a_stamped_dto() {
    let dispatcher = make_dispatcher();

    let dto = dispatcher
        .send(make_create("alice", Some("hello")))
        .await
        .unwrap()
        .value()
        .unwrap();

    assert_eq!(dto.username, "alice");
    assert!(dto.created_at.is_some());
    assert_eq!(dto.profile.unwrap().bio, "hello");
}

#[tokio::test]
async fn create_user_without_bio_has_no_profile() {
    let dispatcher = make_dispatcher();
    let dto = create_user(&dispatcher, "alice").await;
    assert!(dto.profile.is_none());
}

#[tokio::test]
async fn invalid_username_fails_without_writing() {
    let dispatcher = make_dispatcher();

    let outcome = dispatcher.send(make_create("a!", None)).await.unwrap();
    assert!(outcome.is_failure());

    let all = dispatcher.send(GetAllUsersQuery).await.unwrap();
    assert_eq!(all.value().unwrap().len(), 0);
}

#[tokio::test]
async fn duplicate_username_reports_a_conflict() {
    let dispatcher = make_dispatcher();
    create_user(&dispatcher, "bob").await;

    let outcome = dispatcher.send(make_create("bob", None)).await.unwrap();
    assert_eq!(outcome.errors(), vec!["Username 'bob' already exists."]);

    // Exactly one "bob" row survives the rejected second attempt.
    let all = dispatcher
        .send(GetAllUsersQuery)
        .await
        .unwrap()
        .value()
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].username, "bob");
}

// ── GetUserById / GetAllUsers ────────────────────────────────────

#[tokio::test]
async fn get_user_by_id_round_trips() {
    let dispatcher = make_dispatcher();
    let created = create_user(&dispatcher, "alice").await;

    let fetched = dispatcher
        .send(GetUserByIdQuery {
            user_id: created.id,
        })
        .await
        .unwrap()
        .value()
        .unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_unknown_user_fails() {
    let dispatcher = make_dispatcher();
    let outcome = dispatcher
        .send(GetUserByIdQuery {
            user_id: UserId::new(),
        })
        .await
        .unwrap();
    assert_eq!(outcome.errors(), vec!["User not found."]);
}

#[tokio::test]
async fn get_all_users_lists_everyone_with_profiles() {
    let dispatcher = make_dispatcher();
    create_user(&dispatcher, "alice").await;
    dispatcher
        .send(make_create("bob", Some("bio")))
        .await
        .unwrap();

    let all = dispatcher
        .send(GetAllUsersQuery)
        .await
        .unwrap()
        .value()
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|u| u.profile.is_some()).count(), 1);
}

// ── UpdateUserProfile ────────────────────────────────────────────

#[tokio::test]
async fn update_profile_creates_missing_profile_then_mutates_it() {
    let dispatcher = make_dispatcher();
    let user = create_user(&dispatcher, "alice").await;

    let first = dispatcher
        .send(UpdateUserProfileCommand {
            user_id: user.id,
            bio: "v1".to_string(),
        })
        .await
        .unwrap()
        .value()
        .unwrap();
    let first_profile = first.profile.unwrap();
    assert_eq!(first_profile.bio, "v1");

    let second = dispatcher
        .send(UpdateUserProfileCommand {
            user_id: user.id,
            bio: "v2".to_string(),
        })
        .await
        .unwrap()
        .value()
        .unwrap();
    let second_profile = second.profile.unwrap();
    // Upsert mutates the existing row, never creates a second one.
    assert_eq!(second_profile.id, first_profile.id);
    assert_eq!(second_profile.bio, "v2");
}

#[tokio::test]
async fn update_profile_of_unknown_user_fails() {
    let dispatcher = make_dispatcher();
    let outcome = dispatcher
        .send(UpdateUserProfileCommand {
            user_id: UserId::new(),
            bio: "bio".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(outcome.errors(), vec!["User not found."]);
}

// ── BulkReplaceUsers ─────────────────────────────────────────────

fn make_bulk(names: &[&str]) -> BulkReplaceUsersCommand {
    BulkReplaceUsersCommand {
        users: names
            .iter()
            .map(|n| BulkUser {
                username: n.to_string(),
                bio: None,
            })
            .collect(),
    }
}

#[tokio::test]
async fn bulk_replace_swaps_the_whole_population() {
    let dispatcher = make_dispatcher();
    create_user(&dispatcher, "alice").await;
    create_user(&dispatcher, "bob").await;

    let replaced = dispatcher
        .send(make_bulk(&["carol", "dave"]))
        .await
        .unwrap()
        .value()
        .unwrap();
    assert_eq!(replaced.len(), 2);

    let mut names: Vec<String> = dispatcher
        .send(GetAllUsersQuery)
        .await
        .unwrap()
        .value()
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    names.sort();
    assert_eq!(names, vec!["carol", "dave"]);
}

#[tokio::test]
async fn bulk_replace_with_empty_input_fails() {
    let dispatcher = make_dispatcher();
    let outcome = dispatcher.send(make_bulk(&[])).await.unwrap();
    assert_eq!(
        outcome.errors(),
        vec!["No users provided for bulk replace operation."]
    );
}

#[tokio::test]
async fn bulk_replace_rejects_duplicate_input_before_deleting_anything() {
    let dispatcher = make_dispatcher();
    create_user(&dispatcher, "alice").await;

    let outcome = dispatcher.send(make_bulk(&["sam", "sam"])).await.unwrap();
    assert_eq!(outcome.errors(), vec!["Duplicate usernames found: sam"]);

    // Pre-checks fire before the destructive step.
    let survivors = dispatcher
        .send(GetAllUsersQuery)
        .await
        .unwrap()
        .value()
        .unwrap();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].username, "alice");
}

#[tokio::test]
async fn bulk_replace_with_invalid_username_keeps_existing_users() {
    let dispatcher = make_dispatcher();
    create_user(&dispatcher, "alice").await;

    let outcome = dispatcher.send(make_bulk(&["ok_name", "x"])).await.unwrap();
    assert!(outcome.is_failure());

    let survivors = dispatcher
        .send(GetAllUsersQuery)
        .await
        .unwrap()
        .value()
        .unwrap();
    assert_eq!(survivors.len(), 1);
}

#[tokio::test]
async fn bulk_replace_carries_bios_into_profiles() {
    let dispatcher = make_dispatcher();
    let outcome = dispatcher
        .send(BulkReplaceUsersCommand {
            users: vec![
                BulkUser {
                    username: "carol".to_string(),
                    bio: Some("painter".to_string()),
                },
                BulkUser {
                    username: "dave".to_string(),
                    bio: None,
                },
            ],
        })
        .await
        .unwrap();

    let replaced = match outcome {
        Outcome::Success(dtos) => dtos,
        Outcome::Failure(msgs) => panic!("unexpected failure: {msgs:?}"),
    };
    assert_eq!(replaced[0].profile.as_ref().unwrap().bio, "painter");
    assert!(replaced[1].profile.is_none());
}
