// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password login backed by Firebase Auth.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::User;
use crate::response::ApiResponse;
use crate::AppState;

/// Routes reachable without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Routes that need a session; mounted behind `require_auth`.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let user = state.users.login(&body.email, &body.password).await?;

    let token = create_jwt(
        &user.id,
        &user.email,
        user.role,
        &state.config.jwt_signing_key,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let cookie = session_cookie(
        token.clone(),
        is_secure(&state.config.frontend_url),
        time::Duration::seconds(SESSION_TTL_SECS as i64),
    );

    Ok((
        jar.add(cookie),
        ApiResponse::ok("Login successful", LoginResponse { token, user }),
    ))
}

/// Clear the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let cookie = session_cookie(
        String::new(),
        is_secure(&state.config.frontend_url),
        time::Duration::ZERO,
    );
    (jar.add(cookie), StatusCode::NO_CONTENT)
}

async fn me(Extension(user): Extension<AuthUser>) -> ApiResponse<AuthUser> {
    ApiResponse::ok("Session", user)
}

fn session_cookie(value: String, secure: bool, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

/// Plain-HTTP frontends (local development) cannot use `Secure` cookies.
fn is_secure(frontend_url: &str) -> bool {
    frontend_url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string(), true, time::Duration::hours(1)).to_string();
        assert!(cookie.starts_with("ecobreak_token=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn test_is_secure() {
        assert!(is_secure("https://ecobreak.example.com"));
        assert!(!is_secure("http://localhost:5173"));
    }
}
