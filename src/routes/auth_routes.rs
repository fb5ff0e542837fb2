use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, info};
use serde_json::json;

use crate::auth::AuthService;
use crate::error::ApiError;
use crate::models::{LinkWhatsAppRequest, LoginRequest, SignupRequest, VerifyTokenRequest};
use crate::response;
use crate::session::{expired_cookie, session_cookie, AUTH_TOKEN_COOKIE, USER_ID_COOKIE};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/check", web::get().to(check))
            .route("/token", web::get().to(token))
            .route("/session", web::get().to(session))
            .route("/verify-token", web::post().to(verify_token))
            .route("/link-whatsapp", web::post().to(link_whatsapp)),
    );
}

async fn signup(
    auth_service: web::Data<AuthService>,
    body: web::Json<SignupRequest>,
) -> HttpResponse {
    const ENDPOINT: &str = "POST /api/auth/signup";
    match auth_service.signup(body.into_inner()).await {
        Ok(outcome) => {
            info!("Registration successful for: {}", outcome.email);
            response::success(outcome, "Account created", StatusCode::CREATED, ENDPOINT)
        }
        Err(e) => {
            error!("Registration failed: {}", e);
            e.to_response(ENDPOINT)
        }
    }
}

async fn login(
    req: HttpRequest,
    auth_service: web::Data<AuthService>,
    body: web::Json<LoginRequest>,
) -> HttpResponse {
    const ENDPOINT: &str = "POST /api/auth/login";
    let whatsapp_number = req
        .headers()
        .get("X-WhatsApp-Number")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    match auth_service
        .login(body.into_inner(), whatsapp_number.as_deref())
        .await
    {
        Ok(outcome) => {
            let envelope =
                response::success_body(&outcome, "Login successful", StatusCode::OK, ENDPOINT);
            HttpResponse::Ok()
                .cookie(session_cookie(USER_ID_COOKIE, outcome.id.to_string()))
                .cookie(session_cookie(AUTH_TOKEN_COOKIE, outcome.auth_token.clone()))
                .json(envelope)
        }
        Err(e) => {
            error!("Login failed: {}", e);
            e.to_response(ENDPOINT)
        }
    }
}

async fn logout(req: HttpRequest, auth_service: web::Data<AuthService>) -> HttpResponse {
    const ENDPOINT: &str = "POST /api/auth/logout";
    if let Some(cookie) = req.cookie(AUTH_TOKEN_COOKIE) {
        // Cookies are cleared even when revocation fails; the client
        // session ends either way.
        if let Err(e) = auth_service.logout(cookie.value()).await {
            error!("Failed to deactivate token on logout: {}", e);
        }
    }

    let envelope = response::success_body(
        json!({ "success": true }),
        "Logged out successfully",
        StatusCode::OK,
        ENDPOINT,
    );
    HttpResponse::Ok()
        .cookie(expired_cookie(USER_ID_COOKIE))
        .cookie(expired_cookie(AUTH_TOKEN_COOKIE))
        .json(envelope)
}

/// Lightweight session probe for the presentation layer. A valid token
/// cookie wins; a bare user_id cookie is accepted as a weaker fallback
/// good only for UI gating, never for authorizing mutations.
async fn check(req: HttpRequest, auth_service: web::Data<AuthService>) -> HttpResponse {
    const ENDPOINT: &str = "GET /api/auth/check";
    let user_id_cookie = req.cookie(USER_ID_COOKIE);
    let token_cookie = req.cookie(AUTH_TOKEN_COOKIE);

    if let Some(token) = token_cookie {
        return match auth_service.validate_token(token.value()).await {
            Ok(Some(user_id)) => response::success(
                json!({ "authenticated": true, "user_id": user_id }),
                "Authenticated",
                StatusCode::OK,
                ENDPOINT,
            ),
            Ok(None) => not_authenticated(ENDPOINT),
            Err(e) => e.to_response(ENDPOINT),
        };
    }

    match user_id_cookie.and_then(|c| c.value().parse::<i64>().ok()) {
        Some(user_id) => response::success(
            json!({ "authenticated": true, "user_id": user_id }),
            "Authenticated",
            StatusCode::OK,
            ENDPOINT,
        ),
        None => not_authenticated(ENDPOINT),
    }
}

fn not_authenticated(endpoint: &str) -> HttpResponse {
    response::error(
        "Not authenticated",
        StatusCode::UNAUTHORIZED,
        Some(json!({ "authenticated": false })),
        endpoint,
    )
}

/// Hands the httpOnly token back to the client for Bearer use.
async fn token(req: HttpRequest) -> HttpResponse {
    const ENDPOINT: &str = "GET /api/auth/token";
    match req.cookie(AUTH_TOKEN_COOKIE) {
        Some(cookie) => response::success(
            json!({ "token": cookie.value() }),
            "Auth token retrieved",
            StatusCode::OK,
            ENDPOINT,
        ),
        None => ApiError::Auth("Unauthorized: No auth token found".to_string())
            .to_response(ENDPOINT),
    }
}

async fn session(req: HttpRequest) -> HttpResponse {
    const ENDPOINT: &str = "GET /api/auth/session";
    let auth_token = req.cookie(AUTH_TOKEN_COOKIE).map(|c| c.value().to_string());
    let user_id = req.cookie(USER_ID_COOKIE).map(|c| c.value().to_string());

    match (auth_token, user_id) {
        (Some(auth_token), Some(user_id)) => response::success(
            json!({ "authToken": auth_token, "userId": user_id }),
            "Session retrieved",
            StatusCode::OK,
            ENDPOINT,
        ),
        _ => ApiError::Auth("Not authenticated".to_string()).to_response(ENDPOINT),
    }
}

async fn verify_token(
    auth_service: web::Data<AuthService>,
    body: web::Json<VerifyTokenRequest>,
) -> HttpResponse {
    const ENDPOINT: &str = "POST /api/auth/verify-token";
    let Some(token) = body.into_inner().token.filter(|t| !t.is_empty()) else {
        return ApiError::validation("token", "Token is required").to_response(ENDPOINT);
    };

    match auth_service.verify_token(&token).await {
        Ok(verified) => response::success(verified, "Token is valid", StatusCode::OK, ENDPOINT),
        Err(e) => e.to_response(ENDPOINT),
    }
}

async fn link_whatsapp(
    req: HttpRequest,
    auth_service: web::Data<AuthService>,
    body: web::Json<LinkWhatsAppRequest>,
) -> HttpResponse {
    const ENDPOINT: &str = "POST /api/auth/link-whatsapp";
    let Some(user_id) = req
        .cookie(USER_ID_COOKIE)
        .and_then(|c| c.value().parse::<i64>().ok())
    else {
        return ApiError::Auth("Unauthorized: User not authenticated".to_string())
            .to_response(ENDPOINT);
    };
    let Some(phone_number) = body
        .into_inner()
        .phone_number
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
    else {
        return ApiError::validation("phone_number", "Phone number is required")
            .to_response(ENDPOINT);
    };

    match auth_service.link_whatsapp(user_id, &phone_number).await {
        Ok(outcome) => response::success(
            json!({ "message": outcome.message(), "phone_number": phone_number }),
            outcome.message(),
            StatusCode::OK,
            ENDPOINT,
        ),
        Err(e) => e.to_response(ENDPOINT),
    }
}
