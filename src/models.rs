use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One issued session. Rows are never deleted; logout flips `is_active`
/// off so sibling sessions for the same user keep working.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AuthToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub token_type: TokenType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TokenType {
    App,
    Whatsapp,
}

impl TokenType {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::App => "app",
            TokenType::Whatsapp => "whatsapp",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct WhatsAppLink {
    pub id: i64,
    pub user_id: i64,
    pub phone_number: String,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TodoStatus {
    Open,
    Done,
    Archived,
}

impl TodoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TodoStatus::Open => "open",
            TodoStatus::Done => "done",
            TodoStatus::Archived => "archived",
        }
    }

    /// Done goes back to open; anything else completes.
    pub fn toggled(self) -> TodoStatus {
        match self {
            TodoStatus::Done => TodoStatus::Open,
            _ => TodoStatus::Done,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkWhatsAppRequest {
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct InboundActionRequest {
    pub action: Option<String>,
    #[serde(rename = "userAuthToken")]
    pub user_auth_token: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
    #[serde(rename = "todoId")]
    pub todo_id: Option<i64>,
    pub data: Option<TodoPatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_between_done_and_open() {
        assert_eq!(TodoStatus::Open.toggled(), TodoStatus::Done);
        assert_eq!(TodoStatus::Done.toggled(), TodoStatus::Open);
        assert_eq!(TodoStatus::Archived.toggled(), TodoStatus::Done);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TodoStatus::Open).unwrap(),
            "\"open\""
        );
        let parsed: TodoStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(parsed, TodoStatus::Done);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(TodoPatch::default().is_empty());
        let patch = TodoPatch {
            status: Some(TodoStatus::Done),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
