use inkpost_domain::{SessionFactory, StoreError, User, UserProfile};
use inkpost_storage::SqliteSessionFactory;
use inkpost_types::CancelToken;

fn token() -> CancelToken {
    CancelToken::new()
}

// ── save_changes ─────────────────────────────────────────────────

#[tokio::test]
async fn save_changes_reports_written_rows() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let uow = factory.open_session().await.unwrap();
    let cancel = token();

    uow.users().add(User::new("alice"), &cancel).await.unwrap();
    uow.users().add(User::new("bob"), &cancel).await.unwrap();

    assert_eq!(uow.save_changes(&cancel).await.unwrap(), 2);
    // Buffer is drained; a second flush writes nothing.
    assert_eq!(uow.save_changes(&cancel).await.unwrap(), 0);
}

#[tokio::test]
async fn save_changes_stamps_created_at() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let uow = factory.open_session().await.unwrap();
    let cancel = token();

    let user = User::new("alice");
    let id = user.id;
    assert!(user.created_at.is_none());

    uow.users().add(user, &cancel).await.unwrap();
    uow.save_changes(&cancel).await.unwrap();

    let stored = uow.users().get_by_id(id, &cancel).await.unwrap().unwrap();
    assert!(stored.created_at.is_some());
    assert!(stored.updated_at.is_none());
}

#[tokio::test]
async fn update_stamps_updated_at_and_keeps_created_at() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let uow = factory.open_session().await.unwrap();
    let cancel = token();

    let user = User::new("alice");
    let id = user.id;
    uow.users().add(user, &cancel).await.unwrap();
    uow.save_changes(&cancel).await.unwrap();
    let created = uow
        .users()
        .get_by_id(id, &cancel)
        .await
        .unwrap()
        .unwrap()
        .created_at;

    let mut renamed = uow.users().get_by_id(id, &cancel).await.unwrap().unwrap();
    renamed.username = "alice2".to_string();
    uow.users().update(renamed, &cancel).await.unwrap();
    uow.save_changes(&cancel).await.unwrap();

    let stored = uow.users().get_by_id(id, &cancel).await.unwrap().unwrap();
    assert_eq!(stored.username, "alice2");
    assert_eq!(stored.created_at, created);
    assert!(stored.updated_at.is_some());
}

#[tokio::test]
async fn writes_are_flushed_in_enqueue_order() {
    // A profile insert references the user inserted in the same flush;
    // foreign_keys=ON would reject the reverse order.
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let uow = factory.open_session().await.unwrap();
    let cancel = token();

    let user = User::new("alice");
    let user_id = user.id;
    uow.users().add(user, &cancel).await.unwrap();
    uow.users()
        .add_profile(UserProfile::new(user_id, "hi"), &cancel)
        .await
        .unwrap();

    assert_eq!(uow.save_changes(&cancel).await.unwrap(), 2);
    let profile = uow
        .users()
        .get_profile(user_id, &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.bio, "hi");
}

// ── Transaction discipline ───────────────────────────────────────

#[tokio::test]
async fn begin_twice_is_rejected() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let uow = factory.open_session().await.unwrap();
    let cancel = token();

    uow.begin_transaction(&cancel).await.unwrap();
    let second = uow.begin_transaction(&cancel).await;
    assert!(matches!(second, Err(StoreError::TransactionOpen)));

    uow.rollback_transaction().await.unwrap();
}

#[tokio::test]
async fn commit_without_begin_is_a_noop() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let uow = factory.open_session().await.unwrap();
    assert!(uow.commit_transaction(&token()).await.is_ok());
}

#[tokio::test]
async fn rollback_without_begin_is_a_noop() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let uow = factory.open_session().await.unwrap();
    assert!(uow.rollback_transaction().await.is_ok());
}

#[tokio::test]
async fn rollback_discards_flushed_writes() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let cancel = token();

    let uow = factory.open_session().await.unwrap();
    uow.begin_transaction(&cancel).await.unwrap();
    let user = User::new("ghost");
    let id = user.id;
    uow.users().add(user, &cancel).await.unwrap();
    uow.save_changes(&cancel).await.unwrap();

    // Visible inside the transaction (read-your-own-writes)…
    assert!(uow.users().get_by_id(id, &cancel).await.unwrap().is_some());

    uow.rollback_transaction().await.unwrap();

    // …gone after rollback.
    assert!(uow.users().get_by_id(id, &cancel).await.unwrap().is_none());
}

#[tokio::test]
async fn commit_makes_writes_visible_to_later_sessions() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let cancel = token();

    let uow = factory.open_session().await.unwrap();
    uow.begin_transaction(&cancel).await.unwrap();
    let user = User::new("alice");
    let id = user.id;
    uow.users().add(user, &cancel).await.unwrap();
    uow.save_changes(&cancel).await.unwrap();
    uow.commit_transaction(&cancel).await.unwrap();
    drop(uow);

    let later = factory.open_session().await.unwrap();
    assert!(later.users().get_by_id(id, &cancel).await.unwrap().is_some());
}

#[tokio::test]
async fn cancelled_token_prevents_commit() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let cancel = token();

    let uow = factory.open_session().await.unwrap();
    uow.begin_transaction(&cancel).await.unwrap();
    let user = User::new("doomed");
    let id = user.id;
    uow.users().add(user, &cancel).await.unwrap();
    uow.save_changes(&cancel).await.unwrap();

    cancel.cancel();
    let committed = uow.commit_transaction(&cancel).await;
    assert!(matches!(committed, Err(StoreError::Cancelled)));

    uow.rollback_transaction().await.unwrap();
    let fresh = token();
    assert!(uow.users().get_by_id(id, &fresh).await.unwrap().is_none());
}

#[tokio::test]
async fn dropping_session_rolls_back_open_transaction() {
    let factory = SqliteSessionFactory::open_in_memory().unwrap();
    let cancel = token();

    let user = User::new("phantom");
    let id = user.id;
    {
        let uow = factory.open_session().await.unwrap();
        uow.begin_transaction(&cancel).await.unwrap();
        uow.users().add(user, &cancel).await.unwrap();
        uow.save_changes(&cancel).await.unwrap();
        // Dropped without commit or rollback.
    }

    let later = factory.open_session().await.unwrap();
    assert!(later.users().get_by_id(id, &cancel).await.unwrap().is_none());
}

#[tokio::test]
async fn file_backed_store_persists_across_factories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inkpost.db");
    let cancel = token();

    let user = User::new("durable");
    let id = user.id;
    {
        let factory = SqliteSessionFactory::open(&path).unwrap();
        let uow = factory.open_session().await.unwrap();
        uow.users().add(user, &cancel).await.unwrap();
        uow.save_changes(&cancel).await.unwrap();
    }

    let factory = SqliteSessionFactory::open(&path).unwrap();
    let uow = factory.open_session().await.unwrap();
    assert!(uow.users().get_by_id(id, &cancel).await.unwrap().is_some());
}
