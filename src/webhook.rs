use log::{info, warn};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::ApiError;
use crate::models::Todo;

/// Timeout for the fire-and-forget create notification.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// The chat relay keeps the caller waiting, so it gets a longer timeout
/// before the caller gives up. No cancellation is sent upstream when it
/// fires.
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Best-effort bridge to the external workflow engine. Create
/// notifications are spawned and forgotten (no retry, no outbox, a lost
/// notification stays lost); the chat relay is synchronous and passes
/// upstream failures through to the caller.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookDispatcher {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Notify the workflow engine that a todo was created so it can
    /// enhance the description asynchronously. Runs detached from the
    /// request; every failure mode is logged and swallowed.
    pub fn spawn_notify_todo_created(&self, todo: &Todo, user_auth_token: &str) {
        let Some(url) = self.webhook_url.clone() else {
            warn!("Webhook URL not configured, skipping todo-created notification");
            return;
        };

        let mut message = format!(
            "Please update the item \"{}\" to improve the description. \
             Make it more detailed, structured, and actionable.",
            todo.title
        );
        if !todo.description.is_empty() {
            message.push_str(&format!(" Current description: {}", todo.description));
        }

        let payload = json!({
            "message": message,
            "userAuthToken": user_auth_token,
            "userId": todo.user_id,
            "todoId": todo.id,
        });

        let client = self.client.clone();
        let todo_id = todo.id;
        tokio::spawn(async move {
            match client
                .post(&url)
                .json(&payload)
                .timeout(NOTIFY_TIMEOUT)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    info!("Todo-created webhook delivered for todo {}", todo_id);
                }
                Ok(resp) => {
                    warn!(
                        "Todo-created webhook for todo {} returned HTTP {}",
                        todo_id,
                        resp.status()
                    );
                }
                Err(e) => {
                    warn!("Todo-created webhook for todo {} failed: {}", todo_id, e);
                }
            }
        });
    }

    /// Forward a chat message to the workflow engine and wait for its
    /// textual reply. `Ok(None)` means no webhook is configured; a non-2xx
    /// upstream answer surfaces as [`ApiError::Upstream`] with the status
    /// passed through.
    pub async fn relay_chat(
        &self,
        message: &str,
        user_id: i64,
        user_auth_token: &str,
    ) -> Result<Option<String>, ApiError> {
        let Some(url) = &self.webhook_url else {
            warn!("Webhook URL not configured, chat relay is a no-op");
            return Ok(None);
        };

        let payload = json!({
            "message": message,
            "userAuthToken": user_auth_token,
            "userId": user_id,
        });

        let response = self
            .client
            .post(url)
            .json(&payload)
            .timeout(CHAT_TIMEOUT)
            .send()
            .await
            .map_err(|e| ApiError::Upstream {
                status: 502,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await.map_err(|e| ApiError::Upstream {
            status: 502,
            body: e.to_string(),
        })?;
        let reply = body
            .get("output")
            .and_then(Value::as_str)
            .unwrap_or("No response received")
            .to_string();

        info!("Chat relay completed for user {}", user_id);
        Ok(Some(reply))
    }
}
