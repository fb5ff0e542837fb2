use chrono::Utc;
use log::info;
use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::models::{Todo, TodoPatch, TodoStatus};

const MAX_TITLE_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 1000;

const TODO_COLUMNS: &str = "id, user_id, title, description, status, created_at, updated_at";

/// Owner-scoped CRUD over the todos table. Every query filters on both
/// the todo id and the caller's user id, so a row belonging to someone
/// else is indistinguishable from a row that does not exist.
pub struct TodoService {
    pool: SqlitePool,
}

impl TodoService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All todos owned by the user, newest-created first.
    pub async fn list(&self, user_id: i64) -> Result<Vec<Todo>, ApiError> {
        let sql = format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC"
        );
        let todos = sqlx::query_as::<_, Todo>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(todos)
    }

    pub async fn create(
        &self,
        user_id: i64,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Todo, ApiError> {
        let title = title.as_deref().unwrap_or("").trim().to_string();
        if title.is_empty() {
            return Err(ApiError::validation(
                "title",
                "Title is required and cannot be empty",
            ));
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(ApiError::validation("title", "Title is too long"));
        }
        let description = description.as_deref().unwrap_or("").trim().to_string();
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(ApiError::validation("description", "Description is too long"));
        }

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO todos (user_id, title, description, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {TODO_COLUMNS}"
        );
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(user_id)
            .bind(&title)
            .bind(&description)
            .bind(TodoStatus::Open.as_str())
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        info!("Todo {} created for user {}", todo.id, user_id);
        Ok(todo)
    }

    pub async fn get(&self, user_id: i64, todo_id: i64) -> Result<Todo, ApiError> {
        let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ? AND user_id = ?");
        sqlx::query_as::<_, Todo>(&sql)
            .bind(todo_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Todo not found".to_string()))
    }

    /// Partial update of title, description, and status only. An empty
    /// patch is a validation error, not a no-op.
    pub async fn update(
        &self,
        user_id: i64,
        todo_id: i64,
        patch: TodoPatch,
    ) -> Result<Todo, ApiError> {
        if patch.is_empty() {
            return Err(ApiError::validation(
                "body",
                "At least one field must be provided",
            ));
        }

        let title = match &patch.title {
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(ApiError::validation(
                        "title",
                        "Title is required and cannot be empty",
                    ));
                }
                if trimmed.len() > MAX_TITLE_LEN {
                    return Err(ApiError::validation("title", "Title is too long"));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };
        let description = match &patch.description {
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.len() > MAX_DESCRIPTION_LEN {
                    return Err(ApiError::validation("description", "Description is too long"));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };

        let mut sets = Vec::new();
        if title.is_some() {
            sets.push("title = ?");
        }
        if description.is_some() {
            sets.push("description = ?");
        }
        if patch.status.is_some() {
            sets.push("status = ?");
        }

        let sql = format!(
            "UPDATE todos SET {}, updated_at = ? WHERE id = ? AND user_id = ? \
             RETURNING {TODO_COLUMNS}",
            sets.join(", ")
        );

        let mut query = sqlx::query_as::<_, Todo>(&sql);
        if let Some(title) = title {
            query = query.bind(title);
        }
        if let Some(description) = description {
            query = query.bind(description);
        }
        if let Some(status) = patch.status {
            query = query.bind(status.as_str());
        }
        query = query.bind(Utc::now()).bind(todo_id).bind(user_id);

        let todo = query
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Todo not found".to_string()))?;

        info!("Todo {} updated for user {}", todo_id, user_id);
        Ok(todo)
    }

    /// Hard delete, owner-scoped.
    pub async fn delete(&self, user_id: i64, todo_id: i64) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
            .bind(todo_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Todo not found".to_string()));
        }
        info!("Todo {} deleted for user {}", todo_id, user_id);
        Ok(())
    }

    /// Flip done and open, delegating to [`TodoService::update`].
    pub async fn toggle_status(&self, user_id: i64, todo_id: i64) -> Result<Todo, ApiError> {
        let current = self.get(user_id, todo_id).await?;
        let patch = TodoPatch {
            status: Some(current.status.toggled()),
            ..Default::default()
        };
        self.update(user_id, todo_id, patch).await
    }
}
