use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthService;
use crate::error::ApiError;
use crate::response;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/whatsapp").route("/validate-token", web::get().to(validate_token)),
    );
}

#[derive(Debug, Deserialize)]
struct ValidateQuery {
    phone_number: Option<String>,
}

/// Resolves a linked phone number for the workflow engine: the owning
/// user plus their most recent active session token.
async fn validate_token(
    auth_service: web::Data<AuthService>,
    query: web::Query<ValidateQuery>,
) -> HttpResponse {
    const ENDPOINT: &str = "GET /api/whatsapp/validate-token";
    let Some(phone_number) = query
        .into_inner()
        .phone_number
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
    else {
        return ApiError::validation("phone_number", "phone_number query parameter is required")
            .to_response(ENDPOINT);
    };

    info!("Validating WhatsApp number: {}", phone_number);
    match auth_service.resolve_whatsapp_number(&phone_number).await {
        Ok(Some(identity)) => response::success(
            json!({
                "found": true,
                "user_id": identity.user_id,
                "email": identity.email,
                "auth_token": identity.auth_token,
            }),
            "Phone number is linked",
            StatusCode::OK,
            ENDPOINT,
        ),
        Ok(None) => response::error(
            "This phone number is not registered",
            StatusCode::NOT_FOUND,
            Some(json!({ "found": false })),
            ENDPOINT,
        ),
        Err(e) => e.to_response(ENDPOINT),
    }
}
