pub mod auth_routes;
pub mod chat_routes;
pub mod todo_routes;
pub mod whatsapp_routes;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::response;
use crate::webhook::WebhookDispatcher;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(auth_routes::config)
            .configure(todo_routes::config)
            .configure(chat_routes::config)
            .configure(whatsapp_routes::config)
            .route("/health", web::get().to(health)),
    );
}

async fn health(dispatcher: web::Data<WebhookDispatcher>) -> HttpResponse {
    response::success(
        json!({
            "status": "ok",
            "webhookConfigured": dispatcher.is_configured(),
        }),
        "Service is healthy",
        StatusCode::OK,
        "GET /api/health",
    )
}
