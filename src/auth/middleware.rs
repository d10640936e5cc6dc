use crate::auth::token::TokenService;
use crate::db::models::Role;
use crate::error::{AppError, AuthError};
use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use tracing::debug;
use uuid::Uuid;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Caller identity recovered from a validated access token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedPrincipal {
    pub user_id: Uuid,
    pub role: Role,
    pub token: String,
}

impl AuthenticatedPrincipal {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role != role {
            return Err(AuthError::Forbidden.into());
        }
        Ok(())
    }
}

/// Reads the access token from its cookie, falling back to a bearer header.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedPrincipal, AppError> {
    let tokens = req
        .app_data::<web::Data<TokenService>>()
        .ok_or_else(|| AppError::InternalError("token service is not registered".into()))?;
    let token = extract_token(req).ok_or(AuthError::MissingToken)?;

    let (user_id, role) = tokens.validate(&token).map_err(|e| {
        debug!("rejected access token: {}", e);
        e
    })?;

    Ok(AuthenticatedPrincipal { user_id, role, token })
}

impl FromRequest for AuthenticatedPrincipal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

pub fn parse_same_site(value: &str) -> SameSite {
    match value.to_ascii_lowercase().as_str() {
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Strict,
    }
}

/// Builds the `HttpOnly` cookie that carries a freshly issued token.
pub fn access_token_cookie(token: String, ttl_secs: i64, secure: bool, same_site: SameSite) -> Cookie<'static> {
    Cookie::build(ACCESS_TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .max_age(time::Duration::seconds(ttl_secs))
        .finish()
}
