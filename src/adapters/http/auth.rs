use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
    use_cases::manual_activation::Actor,
};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Resolve the caller from the `access_token` cookie, falling back to an
/// `Authorization: Bearer` header for non-browser clients.
pub fn current_actor(
    headers: &HeaderMap,
    cookies: &CookieJar,
    app_state: &AppState,
) -> AppResult<Actor> {
    let token = match cookies.get(ACCESS_TOKEN_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => bearer_token(headers).ok_or(AppError::InvalidCredentials)?,
    };

    let claims = jwt::verify(&token, &app_state.config.jwt_secret)?;
    let user_id = claims.user_id()?;

    if app_state.config.support_user_ids.contains(&user_id) {
        Ok(Actor::support(user_id))
    } else {
        Ok(Actor::user(user_id))
    }
}

/// Support-only endpoints: the caller must be listed in `SUPPORT_USER_IDS`.
pub fn require_support(actor: Actor) -> AppResult<Actor> {
    if actor.is_support {
        Ok(actor)
    } else {
        tracing::warn!(user_id = %actor.user_id, "Support endpoint called by regular user");
        Err(AppError::Forbidden)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}
