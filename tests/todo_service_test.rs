use sqlx::SqlitePool;

use tasklink_backend::auth::AuthService;
use tasklink_backend::error::ApiError;
use tasklink_backend::models::{SignupRequest, TodoPatch, TodoStatus};
use tasklink_backend::todos::TodoService;

mod common;

async fn setup() -> (TodoService, AuthService, SqlitePool) {
    let pool = common::setup_pool().await;
    (
        TodoService::new(pool.clone()),
        AuthService::new(pool.clone()),
        pool,
    )
}

async fn new_user(auth: &AuthService, email: &str) -> i64 {
    auth.signup(SignupRequest {
        email: Some(email.to_string()),
        password: Some("secret1".to_string()),
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let (todos, auth, _pool) = setup().await;
    let user = new_user(&auth, "a@x.com").await;

    let created = todos
        .create(user, Some("  Buy milk  ".to_string()), Some("2% please".to_string()))
        .await
        .unwrap();
    assert_eq!(created.title, "Buy milk");
    assert_eq!(created.description, "2% please");
    assert_eq!(created.status, TodoStatus::Open);

    let fetched = todos.get(user, created.id).await.unwrap();
    assert_eq!(fetched.title, created.title);
    assert_eq!(fetched.description, created.description);
    assert_eq!(fetched.status, TodoStatus::Open);
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let (todos, auth, _pool) = setup().await;
    let user = new_user(&auth, "a@x.com").await;

    let err = todos.create(user, Some("   ".to_string()), None).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    let err = todos.create(user, None, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn oversized_fields_are_rejected() {
    let (todos, auth, _pool) = setup().await;
    let user = new_user(&auth, "a@x.com").await;

    let err = todos
        .create(user, Some("t".repeat(256)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = todos
        .create(user, Some("ok".to_string()), Some("d".repeat(1001)))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn another_user_sees_not_found_never_forbidden() {
    let (todos, auth, _pool) = setup().await;
    let owner = new_user(&auth, "owner@x.com").await;
    let intruder = new_user(&auth, "intruder@x.com").await;

    let todo = todos
        .create(owner, Some("Private".to_string()), None)
        .await
        .unwrap();

    assert!(matches!(
        todos.get(intruder, todo.id).await.unwrap_err(),
        ApiError::NotFound(_)
    ));
    let patch = TodoPatch {
        title: Some("Hijacked".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        todos.update(intruder, todo.id, patch).await.unwrap_err(),
        ApiError::NotFound(_)
    ));
    assert!(matches!(
        todos.delete(intruder, todo.id).await.unwrap_err(),
        ApiError::NotFound(_)
    ));

    // The owner still sees it untouched.
    let unchanged = todos.get(owner, todo.id).await.unwrap();
    assert_eq!(unchanged.title, "Private");
}

#[tokio::test]
async fn empty_patch_is_rejected() {
    let (todos, auth, _pool) = setup().await;
    let user = new_user(&auth, "a@x.com").await;
    let todo = todos.create(user, Some("Task".to_string()), None).await.unwrap();

    let err = todos
        .update(user, todo.id, TodoPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn update_changes_only_listed_fields() {
    let (todos, auth, _pool) = setup().await;
    let user = new_user(&auth, "a@x.com").await;
    let todo = todos
        .create(user, Some("Task".to_string()), Some("before".to_string()))
        .await
        .unwrap();

    let patch = TodoPatch {
        status: Some(TodoStatus::Done),
        ..Default::default()
    };
    let updated = todos.update(user, todo.id, patch).await.unwrap();
    assert_eq!(updated.status, TodoStatus::Done);
    assert_eq!(updated.title, "Task");
    assert_eq!(updated.description, "before");
}

#[tokio::test]
async fn toggle_twice_restores_the_original_status() {
    let (todos, auth, _pool) = setup().await;
    let user = new_user(&auth, "a@x.com").await;
    let todo = todos.create(user, Some("Task".to_string()), None).await.unwrap();

    let once = todos.toggle_status(user, todo.id).await.unwrap();
    assert_eq!(once.status, TodoStatus::Done);
    let twice = todos.toggle_status(user, todo.id).await.unwrap();
    assert_eq!(twice.status, TodoStatus::Open);
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let (todos, auth, _pool) = setup().await;
    let user = new_user(&auth, "a@x.com").await;
    let todo = todos.create(user, Some("Task".to_string()), None).await.unwrap();

    todos.delete(user, todo.id).await.unwrap();
    assert!(matches!(
        todos.get(user, todo.id).await.unwrap_err(),
        ApiError::NotFound(_)
    ));
}

#[tokio::test]
async fn list_returns_newest_first_and_only_own_rows() {
    let (todos, auth, _pool) = setup().await;
    let user = new_user(&auth, "a@x.com").await;
    let other = new_user(&auth, "b@x.com").await;

    let first = todos.create(user, Some("first".to_string()), None).await.unwrap();
    let second = todos.create(user, Some("second".to_string()), None).await.unwrap();
    let third = todos.create(user, Some("third".to_string()), None).await.unwrap();
    todos.create(other, Some("not mine".to_string()), None).await.unwrap();

    let listed = todos.list(user).await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
}
