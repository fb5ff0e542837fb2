use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

use crate::auth::AuthService;
use crate::error::ApiError;
use crate::models::{CreateTodoRequest, TodoPatch};
use crate::response;
use crate::todos::TodoService;
use crate::webhook::WebhookDispatcher;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/todos")
            .route("", web::get().to(list))
            .route("", web::post().to(create))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::patch().to(update))
            .route("/{id}", web::delete().to(delete)),
    );
}

/// Resolve the Bearer token into a user id through the single token
/// validation primitive. Returns the raw token too so the create path can
/// hand it to the webhook dispatcher.
async fn require_bearer_user(
    req: &HttpRequest,
    auth_service: &AuthService,
) -> Result<(i64, String), ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            ApiError::Auth("Unauthorized: Invalid or missing auth token".to_string())
        })?;

    let user_id = auth_service
        .validate_token(token)
        .await?
        .ok_or_else(|| {
            ApiError::Auth("Unauthorized: Invalid or missing auth token".to_string())
        })?;
    Ok((user_id, token.to_string()))
}

async fn list(
    req: HttpRequest,
    auth_service: web::Data<AuthService>,
    todo_service: web::Data<TodoService>,
) -> HttpResponse {
    const ENDPOINT: &str = "GET /api/todos";
    let (user_id, _) = match require_bearer_user(&req, &auth_service).await {
        Ok(ok) => ok,
        Err(e) => return e.to_response(ENDPOINT),
    };

    match todo_service.list(user_id).await {
        Ok(todos) => {
            let message = format!("Found {} todos", todos.len());
            response::success(todos, &message, StatusCode::OK, ENDPOINT)
        }
        Err(e) => e.to_response(ENDPOINT),
    }
}

async fn create(
    req: HttpRequest,
    auth_service: web::Data<AuthService>,
    todo_service: web::Data<TodoService>,
    dispatcher: web::Data<WebhookDispatcher>,
    body: web::Json<CreateTodoRequest>,
) -> HttpResponse {
    const ENDPOINT: &str = "POST /api/todos";
    let (user_id, token) = match require_bearer_user(&req, &auth_service).await {
        Ok(ok) => ok,
        Err(e) => return e.to_response(ENDPOINT),
    };

    let input = body.into_inner();
    match todo_service.create(user_id, input.title, input.description).await {
        Ok(todo) => {
            // Fire-and-forget: a lost notification never fails the create.
            dispatcher.spawn_notify_todo_created(&todo, &token);
            info!("Todo created: {}", todo.id);
            response::success(todo, "Todo created successfully", StatusCode::CREATED, ENDPOINT)
        }
        Err(e) => e.to_response(ENDPOINT),
    }
}

async fn get(
    req: HttpRequest,
    auth_service: web::Data<AuthService>,
    todo_service: web::Data<TodoService>,
    path: web::Path<i64>,
) -> HttpResponse {
    const ENDPOINT: &str = "GET /api/todos/{id}";
    let (user_id, _) = match require_bearer_user(&req, &auth_service).await {
        Ok(ok) => ok,
        Err(e) => return e.to_response(ENDPOINT),
    };

    match todo_service.get(user_id, path.into_inner()).await {
        Ok(todo) => response::success(todo, "Todo fetched", StatusCode::OK, ENDPOINT),
        Err(e) => e.to_response(ENDPOINT),
    }
}

async fn update(
    req: HttpRequest,
    auth_service: web::Data<AuthService>,
    todo_service: web::Data<TodoService>,
    path: web::Path<i64>,
    body: web::Json<TodoPatch>,
) -> HttpResponse {
    const ENDPOINT: &str = "PATCH /api/todos/{id}";
    let (user_id, _) = match require_bearer_user(&req, &auth_service).await {
        Ok(ok) => ok,
        Err(e) => return e.to_response(ENDPOINT),
    };

    match todo_service
        .update(user_id, path.into_inner(), body.into_inner())
        .await
    {
        Ok(todo) => response::success(todo, "Todo updated successfully", StatusCode::OK, ENDPOINT),
        Err(e) => e.to_response(ENDPOINT),
    }
}

async fn delete(
    req: HttpRequest,
    auth_service: web::Data<AuthService>,
    todo_service: web::Data<TodoService>,
    path: web::Path<i64>,
) -> HttpResponse {
    const ENDPOINT: &str = "DELETE /api/todos/{id}";
    let (user_id, _) = match require_bearer_user(&req, &auth_service).await {
        Ok(ok) => ok,
        Err(e) => return e.to_response(ENDPOINT),
    };

    let todo_id = path.into_inner();
    match todo_service.delete(user_id, todo_id).await {
        Ok(()) => response::success(
            json!({ "id": todo_id }),
            "Todo deleted successfully",
            StatusCode::OK,
            ENDPOINT,
        ),
        Err(e) => e.to_response(ENDPOINT),
    }
}
