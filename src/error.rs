use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use std::collections::BTreeMap;

use crate::response;

/// Error taxonomy shared by every service. Each variant carries its HTTP
/// status so route handlers never re-map errors by hand.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// The external workflow engine answered with a non-2xx status; the
    /// status is passed through to the caller.
    #[error("Error from workflow engine")]
    Upstream { status: u16, body: String },

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &str, problem: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), problem.to_string());
        ApiError::Validation(fields)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Database(_) | ApiError::Hash(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Validation(fields) => Some(json!({ "validationErrors": fields })),
            ApiError::Upstream { status, body } => Some(json!({
                "webhookStatus": status,
                "webhookError": body,
            })),
            _ => None,
        }
    }

    /// Render this error as the standard response envelope, tagged with
    /// the endpoint that produced it.
    pub fn to_response(&self, endpoint: &str) -> HttpResponse {
        response::error(&self.to_string(), self.status(), self.details(), endpoint)
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        response::error(&self.to_string(), self.status(), self.details(), "")
    }
}

/// SQLite reports duplicate keys through the error message; the unique
/// constraint is the real duplicate guard, the pre-insert lookup is only
/// a fast-path hint.
pub fn is_unique_violation(err: &sqlx::Error, column: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let msg = db.message();
            msg.contains("UNIQUE constraint failed") && msg.contains(column)
        }
        _ => false,
    }
}
