use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde_json::json;

use crate::auth::AuthService;
use crate::error::ApiError;
use crate::models::{ChatRequest, InboundActionRequest, TodoPatch};
use crate::response;
use crate::session::{AUTH_TOKEN_COOKIE, USER_ID_COOKIE};
use crate::todos::TodoService;
use crate::webhook::WebhookDispatcher;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/chat")
            .route("", web::post().to(chat))
            .route("/webhook", web::post().to(inbound_action)),
    );
}

/// Synchronous relay: the caller waits for the workflow engine's reply,
/// so upstream failures surface instead of being swallowed.
async fn chat(
    req: HttpRequest,
    dispatcher: web::Data<WebhookDispatcher>,
    body: web::Json<ChatRequest>,
) -> HttpResponse {
    const ENDPOINT: &str = "POST /api/chat";
    let Some(auth_token) = req.cookie(AUTH_TOKEN_COOKIE).map(|c| c.value().to_string()) else {
        return ApiError::Auth("Unauthorized".to_string()).to_response(ENDPOINT);
    };

    let input = body.into_inner();
    let Some(message) = input
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
    else {
        return ApiError::validation("message", "Message is required and cannot be empty")
            .to_response(ENDPOINT);
    };
    let user_id = input.user_id.or_else(|| {
        req.cookie(USER_ID_COOKIE)
            .and_then(|c| c.value().parse::<i64>().ok())
    });
    let Some(user_id) = user_id else {
        return ApiError::validation("userId", "User id is required").to_response(ENDPOINT);
    };

    match dispatcher.relay_chat(&message, user_id, &auth_token).await {
        Ok(Some(reply)) => response::success(
            json!({ "response": reply }),
            "Message processed successfully",
            StatusCode::OK,
            ENDPOINT,
        ),
        Ok(None) => response::success(
            json!({ "response": "Message ready (webhook not configured)" }),
            "Success (webhook not configured)",
            StatusCode::OK,
            ENDPOINT,
        ),
        Err(e) => e.to_response(ENDPOINT),
    }
}

/// Inbound tool endpoint for the workflow engine. Actions run through the
/// same token validation and todo service as every other client; nothing
/// here bypasses ownership scoping.
async fn inbound_action(
    auth_service: web::Data<AuthService>,
    todo_service: web::Data<TodoService>,
    body: web::Json<InboundActionRequest>,
) -> HttpResponse {
    const ENDPOINT: &str = "POST /api/chat/webhook";
    let input = body.into_inner();

    let (Some(action), Some(token), Some(_)) =
        (input.action.clone(), input.user_auth_token.clone(), input.user_id)
    else {
        return ApiError::validation(
            "body",
            "Missing required fields: action, userAuthToken, userId",
        )
        .to_response(ENDPOINT);
    };

    let user_id = match auth_service.validate_token(&token).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => {
            return ApiError::Auth("Unauthorized: Invalid or missing auth token".to_string())
                .to_response(ENDPOINT)
        }
        Err(e) => return e.to_response(ENDPOINT),
    };

    info!("Processing inbound action: {}", action);
    match execute_action(&todo_service, user_id, &action, input.todo_id, input.data).await {
        Ok(message) => response::success(
            json!({ "success": true, "message": message }),
            &message,
            StatusCode::OK,
            ENDPOINT,
        ),
        Err(message) => {
            warn!("Inbound action failed: {}", message);
            response::error(&message, StatusCode::BAD_REQUEST, None, ENDPOINT)
        }
    }
}

async fn execute_action(
    todo_service: &TodoService,
    user_id: i64,
    action: &str,
    todo_id: Option<i64>,
    data: Option<TodoPatch>,
) -> Result<String, String> {
    match action {
        "create_todo" => {
            let data = data.unwrap_or_default();
            let title = data.title.unwrap_or_else(|| "Untitled".to_string());
            let todo = todo_service
                .create(user_id, Some(title), data.description)
                .await
                .map_err(|e| format!("Failed to create todo: {}", e))?;
            Ok(format!("Created: \"{}\"", todo.title))
        }
        "update_todo" => {
            let todo_id = todo_id.ok_or("Todo ID required for update")?;
            todo_service
                .update(user_id, todo_id, data.unwrap_or_default())
                .await
                .map_err(|e| format!("Failed to update todo: {}", e))?;
            Ok("Updated todo successfully".to_string())
        }
        "delete_todo" => {
            let todo_id = todo_id.ok_or("Todo ID required for deletion")?;
            todo_service
                .delete(user_id, todo_id)
                .await
                .map_err(|e| format!("Failed to delete todo: {}", e))?;
            Ok("Deleted todo successfully".to_string())
        }
        "toggle_todo" => {
            let todo_id = todo_id.ok_or("Todo ID required for toggle")?;
            let todo = todo_service
                .toggle_status(user_id, todo_id)
                .await
                .map_err(|e| format!("Failed to toggle todo: {}", e))?;
            let label = match todo.status {
                crate::models::TodoStatus::Done => "completed",
                _ => "active",
            };
            Ok(format!("Marked as {}", label))
        }
        other => Err(format!("Unknown action: {}", other)),
    }
}
