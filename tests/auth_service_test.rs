use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use tasklink_backend::auth::{AuthService, LinkOutcome};
use tasklink_backend::error::ApiError;
use tasklink_backend::models::{LoginRequest, SignupRequest};

mod common;

fn signup_req(email: &str, password: &str) -> SignupRequest {
    SignupRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

fn login_req(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

async fn service() -> (AuthService, SqlitePool) {
    let pool = common::setup_pool().await;
    (AuthService::new(pool.clone()), pool)
}

#[tokio::test]
async fn signup_then_login_issues_a_distinct_token() {
    let (auth, _pool) = service().await;

    let signup = auth.signup(signup_req("a@x.com", "secret1")).await.unwrap();
    assert_eq!(signup.email, "a@x.com");
    assert!(!signup.auth_token.is_empty());

    let login = auth
        .login(login_req("a@x.com", "secret1"), None)
        .await
        .unwrap();
    assert_eq!(login.id, signup.id);
    assert_ne!(login.auth_token, signup.auth_token);
    assert_eq!(login.redirect, "/");
}

#[tokio::test]
async fn bad_password_and_unknown_email_report_the_same_error() {
    let (auth, _pool) = service().await;
    auth.signup(signup_req("a@x.com", "secret1")).await.unwrap();

    let wrong_password = auth
        .login(login_req("a@x.com", "wrong"), None)
        .await
        .unwrap_err();
    let unknown_email = auth
        .login(login_req("nobody@x.com", "secret1"), None)
        .await
        .unwrap_err();

    match (&wrong_password, &unknown_email) {
        (ApiError::Auth(a), ApiError::Auth(b)) => {
            assert_eq!(a, b);
            assert_eq!(a, "Invalid email or password");
        }
        other => panic!("expected auth errors, got {:?}", other),
    }
}

#[tokio::test]
async fn short_password_is_rejected() {
    let (auth, _pool) = service().await;
    let err = auth.signup(signup_req("a@x.com", "short")).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let (auth, _pool) = service().await;
    auth.signup(signup_req("a@x.com", "secret1")).await.unwrap();
    let err = auth.signup(signup_req("a@x.com", "secret2")).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn logout_only_kills_the_presented_session() {
    let (auth, _pool) = service().await;
    auth.signup(signup_req("a@x.com", "secret1")).await.unwrap();
    let first = auth
        .login(login_req("a@x.com", "secret1"), None)
        .await
        .unwrap();
    let second = auth
        .login(login_req("a@x.com", "secret1"), None)
        .await
        .unwrap();

    auth.logout(&first.auth_token).await.unwrap();

    assert_eq!(auth.validate_token(&first.auth_token).await.unwrap(), None);
    assert_eq!(
        auth.validate_token(&second.auth_token).await.unwrap(),
        Some(second.id)
    );
}

#[tokio::test]
async fn logout_of_unknown_token_is_idempotent() {
    let (auth, _pool) = service().await;
    auth.logout("not-a-real-token").await.unwrap();
}

#[tokio::test]
async fn inactive_token_never_validates() {
    let (auth, pool) = service().await;
    let signup = auth.signup(signup_req("a@x.com", "secret1")).await.unwrap();
    assert!(auth
        .validate_token(&signup.auth_token)
        .await
        .unwrap()
        .is_some());

    sqlx::query("UPDATE auth_tokens SET is_active = 0 WHERE token = ?")
        .bind(&signup.auth_token)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(auth.validate_token(&signup.auth_token).await.unwrap(), None);
}

#[tokio::test]
async fn expired_token_is_invalid_even_when_active() {
    let (auth, pool) = service().await;
    let signup = auth.signup(signup_req("a@x.com", "secret1")).await.unwrap();

    sqlx::query(
        "INSERT INTO auth_tokens (user_id, token, token_type, is_active, created_at, expires_at) \
         VALUES (?, 'expired-token-expired-token-expired-token123', 'app', 1, ?, ?)",
    )
    .bind(signup.id)
    .bind(Utc::now())
    .bind(Utc::now() - Duration::hours(1))
    .execute(&pool)
    .await
    .unwrap();

    let token = "expired-token-expired-token-expired-token123";
    assert_eq!(auth.validate_token(token).await.unwrap(), None);

    let err = auth.verify_token(token).await.unwrap_err();
    match err {
        ApiError::Auth(msg) => assert_eq!(msg, "Token expired"),
        other => panic!("expected auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn validate_bumps_last_used_at() {
    let (auth, pool) = service().await;
    let signup = auth.signup(signup_req("a@x.com", "secret1")).await.unwrap();

    auth.validate_token(&signup.auth_token).await.unwrap();

    let last_used: Option<chrono::DateTime<Utc>> = sqlx::query_scalar(
        "SELECT last_used_at FROM auth_tokens WHERE token = ?",
    )
    .bind(&signup.auth_token)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(last_used.is_some());
}

#[tokio::test]
async fn verify_token_resolves_user_and_expiry() {
    let (auth, _pool) = service().await;
    let signup = auth.signup(signup_req("a@x.com", "secret1")).await.unwrap();

    let verified = auth.verify_token(&signup.auth_token).await.unwrap();
    assert_eq!(verified.user_id, signup.id);
    assert_eq!(verified.email, "a@x.com");
    assert_eq!(verified.expires_at, None);

    let err = auth.verify_token("bogus").await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(_)));
}

#[tokio::test]
async fn whatsapp_link_transfers_to_the_last_writer() {
    let (auth, _pool) = service().await;
    let u1 = auth.signup(signup_req("u1@x.com", "secret1")).await.unwrap();
    auth.signup(signup_req("u2@x.com", "secret1")).await.unwrap();

    let outcome = auth.link_whatsapp(u1.id, "+1555").await.unwrap();
    assert_eq!(outcome, LinkOutcome::Linked);
    let again = auth.link_whatsapp(u1.id, "+1555").await.unwrap();
    assert_eq!(again, LinkOutcome::AlreadyLinked);

    // Logging in as u2 with the same number in the header steals the link.
    let login = auth
        .login(login_req("u2@x.com", "secret1"), Some("+1555"))
        .await
        .unwrap();
    assert_eq!(login.redirect, "/whatsapp-authenticated?number=%2B1555");

    let identity = auth
        .resolve_whatsapp_number("+1555")
        .await
        .unwrap()
        .expect("number should resolve");
    assert_eq!(identity.user_id, login.id);
    assert_eq!(identity.email, "u2@x.com");
    // The surfaced token is u2's freshest active session.
    assert_eq!(identity.auth_token.as_deref(), Some(login.auth_token.as_str()));
}

#[tokio::test]
async fn unlinked_number_resolves_to_nothing() {
    let (auth, _pool) = service().await;
    assert!(auth.resolve_whatsapp_number("+999").await.unwrap().is_none());
}
