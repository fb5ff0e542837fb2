use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeMap;

use crate::error::{is_unique_violation, ApiError};
use crate::models::{LoginRequest, SignupRequest, TokenType, User};
use crate::token::{generate_auth_token, has_token_shape};

const MIN_PASSWORD_LEN: usize = 6;

/// Owns the user, token, and WhatsApp-link tables. Every protected
/// operation in the system authorizes through [`AuthService::validate_token`];
/// no other component reads the credential tables.
pub struct AuthService {
    pool: SqlitePool,
}

#[derive(Debug, Serialize)]
pub struct SignupOutcome {
    pub id: i64,
    pub email: String,
    pub auth_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub id: i64,
    pub email: String,
    pub auth_token: String,
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub struct VerifiedToken {
    pub user_id: i64,
    pub email: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct WhatsAppIdentity {
    pub user_id: i64,
    pub email: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    AlreadyLinked,
    Transferred,
}

impl LinkOutcome {
    pub fn message(self) -> &'static str {
        match self {
            LinkOutcome::Linked => "WhatsApp number linked successfully",
            LinkOutcome::AlreadyLinked => "WhatsApp number already linked to this user",
            LinkOutcome::Transferred => "WhatsApp number transferred to this account",
        }
    }
}

#[derive(FromRow)]
struct ActiveTokenRow {
    id: i64,
    user_id: i64,
    expires_at: Option<DateTime<Utc>>,
}

impl AuthService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<SignupOutcome, ApiError> {
        let (email, password) = require_credentials(req.email, req.password)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(
                "password",
                "Password must be at least 6 characters",
            ));
        }

        // Fast-path duplicate hint; the unique constraint on users.email
        // is the actual guard against concurrent signups.
        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            error!("Signup rejected, email already registered: {}", email);
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash(password.as_bytes(), DEFAULT_COST)?;
        let now = Utc::now();

        info!("Creating new user with email: {}", email);
        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "users.email") {
                ApiError::Conflict("Email already registered".to_string())
            } else {
                ApiError::Database(e)
            }
        })?;
        let user_id = result.last_insert_rowid();

        // Token-row failure does not fail the signup; the account exists,
        // it just has no usable session yet.
        let auth_token = generate_auth_token();
        if let Err(e) = self.insert_token(user_id, &auth_token, TokenType::App).await {
            error!("Failed to store signup token for user {}: {}", user_id, e);
        }

        info!("User registered successfully: {}", email);
        Ok(SignupOutcome {
            id: user_id,
            email,
            auth_token,
        })
    }

    pub async fn login(
        &self,
        req: LoginRequest,
        whatsapp_number: Option<&str>,
    ) -> Result<LoginOutcome, ApiError> {
        let (email, password) = require_credentials(req.email, req.password)?;

        info!("Attempting login for user: {}", email);
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            // Same message as the bad-password branch so callers cannot
            // probe which emails exist.
            error!("User not found: {}", email);
            ApiError::Auth("Invalid email or password".to_string())
        })?;

        if !verify(password.as_bytes(), &user.password_hash)? {
            error!("Invalid password for user: {}", email);
            return Err(ApiError::Auth("Invalid email or password".to_string()));
        }

        // Always a fresh token row; earlier sessions stay valid.
        let auth_token = generate_auth_token();
        self.insert_token(user.id, &auth_token, TokenType::App)
            .await?;

        let redirect = match whatsapp_number {
            Some(number) => {
                self.upsert_whatsapp_link(user.id, number).await?;
                format!("/whatsapp-authenticated?number={}", encode_query_value(number))
            }
            None => "/".to_string(),
        };

        info!("User logged in successfully: {}", user.email);
        Ok(LoginOutcome {
            id: user.id,
            email: user.email,
            auth_token,
            redirect,
        })
    }

    /// Deactivate a single session token. Idempotent: unknown or
    /// already-inactive tokens are not an error.
    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let result = sqlx::query("UPDATE auth_tokens SET is_active = 0 WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        info!("Logout deactivated {} token row(s)", result.rows_affected());
        Ok(())
    }

    /// The single authorization primitive. A token authorizes if and only
    /// if its row is active and not past its expiry. Returns the owning
    /// user id, or `None` for anything invalid.
    pub async fn validate_token(&self, token: &str) -> Result<Option<i64>, ApiError> {
        if !has_token_shape(token) {
            return Ok(None);
        }
        let rows = sqlx::query_as::<_, ActiveTokenRow>(
            "SELECT id, user_id, expires_at FROM auth_tokens WHERE token = ? AND is_active = 1",
        )
        .bind(token)
        .fetch_all(&self.pool)
        .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        if rows.len() > 1 {
            warn!("Multiple active rows for one token (unexpected), using the first");
        }
        if let Some(expires_at) = row.expires_at {
            if expires_at < Utc::now() {
                return Ok(None);
            }
        }

        self.touch_token(row.id).await;
        Ok(Some(row.user_id))
    }

    /// Full token lookup for integrations: resolves the owning user and
    /// reports expiry, with distinct errors for invalid vs expired.
    pub async fn verify_token(&self, token: &str) -> Result<VerifiedToken, ApiError> {
        if !has_token_shape(token) {
            return Err(ApiError::Auth("Invalid token".to_string()));
        }
        let rows = sqlx::query_as::<_, ActiveTokenRow>(
            "SELECT id, user_id, expires_at FROM auth_tokens WHERE token = ? AND is_active = 1",
        )
        .bind(token)
        .fetch_all(&self.pool)
        .await?;

        let row = rows
            .first()
            .ok_or_else(|| ApiError::Auth("Invalid token".to_string()))?;
        if let Some(expires_at) = row.expires_at {
            if expires_at < Utc::now() {
                return Err(ApiError::Auth("Token expired".to_string()));
            }
        }

        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(row.user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        self.touch_token(row.id).await;
        Ok(VerifiedToken {
            user_id: user.id,
            email: user.email,
            expires_at: row.expires_at,
        })
    }

    /// Link a phone number to a user. If the number already belongs to a
    /// different user, ownership transfers to the caller (last writer
    /// wins, no merge).
    pub async fn link_whatsapp(
        &self,
        user_id: i64,
        phone_number: &str,
    ) -> Result<LinkOutcome, ApiError> {
        self.upsert_whatsapp_link(user_id, phone_number).await
    }

    /// Resolve an inbound WhatsApp identity to its user and the user's
    /// most recent active token. Used by the workflow engine to act on
    /// behalf of a linked user.
    pub async fn resolve_whatsapp_number(
        &self,
        phone_number: &str,
    ) -> Result<Option<WhatsAppIdentity>, ApiError> {
        let owner = sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM user_whatsapp_numbers WHERE phone_number = ?",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await?;
        let Some(user_id) = owner else {
            return Ok(None);
        };

        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let auth_token = sqlx::query_scalar::<_, String>(
            "SELECT token FROM auth_tokens \
             WHERE user_id = ? AND is_active = 1 \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        // Best-effort bookkeeping, never surfaced to the caller.
        if let Err(e) = sqlx::query(
            "UPDATE user_whatsapp_numbers SET last_used = ? WHERE phone_number = ?",
        )
        .bind(Utc::now())
        .bind(phone_number)
        .execute(&self.pool)
        .await
        {
            warn!("Failed to update WhatsApp link last_used: {}", e);
        }

        info!("WhatsApp number resolved to user {}", user.id);
        Ok(Some(WhatsAppIdentity {
            user_id: user.id,
            email: user.email,
            auth_token,
        }))
    }

    async fn upsert_whatsapp_link(
        &self,
        user_id: i64,
        phone_number: &str,
    ) -> Result<LinkOutcome, ApiError> {
        let now = Utc::now();
        let existing_owner = sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM user_whatsapp_numbers WHERE phone_number = ?",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await?;

        match existing_owner {
            Some(owner) if owner == user_id => Ok(LinkOutcome::AlreadyLinked),
            Some(owner) => {
                info!(
                    "Transferring WhatsApp number from user {} to user {}",
                    owner, user_id
                );
                sqlx::query(
                    "UPDATE user_whatsapp_numbers \
                     SET user_id = ?, last_used = ?, updated_at = ? \
                     WHERE phone_number = ?",
                )
                .bind(user_id)
                .bind(now)
                .bind(now)
                .bind(phone_number)
                .execute(&self.pool)
                .await?;
                Ok(LinkOutcome::Transferred)
            }
            None => {
                sqlx::query(
                    "INSERT INTO user_whatsapp_numbers \
                     (user_id, phone_number, created_at, updated_at) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(user_id)
                .bind(phone_number)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?;
                Ok(LinkOutcome::Linked)
            }
        }
    }

    async fn insert_token(
        &self,
        user_id: i64,
        token: &str,
        token_type: TokenType,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO auth_tokens (user_id, token, token_type, is_active, created_at) \
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(user_id)
        .bind(token)
        .bind(token_type.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // Opportunistic last_used_at bump; failures are logged and swallowed.
    async fn touch_token(&self, token_id: i64) {
        if let Err(e) = sqlx::query("UPDATE auth_tokens SET last_used_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(token_id)
            .execute(&self.pool)
            .await
        {
            warn!("Failed to update token last_used_at: {}", e);
        }
    }
}

fn require_credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String), ApiError> {
    let mut problems = BTreeMap::new();
    if email.as_deref().map_or(true, |e| e.trim().is_empty()) {
        problems.insert("email".to_string(), "Email is required".to_string());
    }
    if password.as_deref().map_or(true, str::is_empty) {
        problems.insert("password".to_string(), "Password is required".to_string());
    }
    if !problems.is_empty() {
        return Err(ApiError::Validation(problems));
    }
    // Both checked above.
    Ok((email.unwrap_or_default(), password.unwrap_or_default()))
}

fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
