use actix_web::body::EitherBody;
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, HttpResponse};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::info;

pub const USER_ID_COOKIE: &str = "user_id";
pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

const SESSION_TTL_DAYS: i64 = 7;

/// Protected, transport-secured session cookie with a 7-day expiry.
pub fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .max_age(CookieDuration::days(SESSION_TTL_DAYS))
        .path("/")
        .finish()
}

pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name, "")
        .http_only(true)
        .max_age(CookieDuration::ZERO)
        .path("/")
        .finish()
}

/// Where the gate should send a request, if anywhere. Decides from cookie
/// *presence* only; page paths get UX-level redirects while `/api` always
/// passes through to real token validation.
fn classify(path: &str, query: &str, authenticated: bool) -> Option<String> {
    if path.starts_with("/api") {
        return None;
    }
    let on_login = path.starts_with("/login");
    if !authenticated && !on_login {
        return Some("/login".to_string());
    }
    if authenticated && on_login {
        if !query.is_empty() && query.split('&').any(|pair| pair.starts_with("number=")) {
            return Some(format!("/whatsapp-authenticated?{}", query));
        }
        return Some("/".to_string());
    }
    None
}

/// Edge gate for the page surfaces. Advisory only: it never substitutes
/// for `AuthService::validate_token` on mutating operations.
pub struct SessionGate;

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGateMiddleware { service }))
    }
}

pub struct SessionGateMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for SessionGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authenticated = req.cookie(USER_ID_COOKIE).is_some();
        if let Some(target) = classify(req.path(), req.query_string(), authenticated) {
            info!("Session gate: {} -> {}", req.path(), target);
            let response = HttpResponse::Found()
                .insert_header((header::LOCATION, target))
                .finish();
            return Box::pin(ready(Ok(req.into_response(response).map_into_right_body())));
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) })
    }
}
