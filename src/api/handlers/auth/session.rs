//! Session endpoints: password login, logout, and session introspection.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::claims::{create_session_token, verify_session_token, SessionClaims};
use super::cookie;
use super::error::{AuthError, ErrorResponse};
use super::redirect::post_login_redirect;
use super::state::AuthState;
use super::storage::{self, UserRecord};
use super::types::{LoginRequest, LoginResponse, SessionResponse};
use super::utils::{normalize_email, valid_email, verify_password};

/// Sign a session for the user and build the Set-Cookie header for this
/// request's host. The single issuance funnel for every login entry point.
pub(super) fn create_and_set_session(
    state: &AuthState,
    request_headers: &HeaderMap,
    user: &UserRecord,
) -> Result<(HeaderMap, String), AuthError> {
    let claims = SessionClaims::for_user(user, state.config().session_ttl_seconds());
    let token = create_session_token(state.keys(), &claims)?;

    let host = cookie::request_host(request_headers, state.config());
    let value = cookie::session_cookie(
        state.config(),
        &host,
        &token,
        state.config().session_ttl_seconds(),
    )
    .map_err(|err| AuthError::Internal(anyhow::anyhow!("invalid session cookie: {err}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, value);
    Ok((headers, token))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::validation("missing payload"));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::validation("invalid email"));
    }
    if request.password.is_empty() {
        return Err(AuthError::validation("missing password"));
    }

    let user = storage::lookup_user_by_email(&pool, &email).await?;

    // Absent user, absent hash, and wrong password all collapse into the
    // same answer.
    let user = match user {
        Some(user) => user,
        None => return Err(AuthError::InvalidCredentials),
    };
    let verified = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&request.password, hash));
    if !verified {
        return Err(AuthError::InvalidCredentials);
    }

    let (cookie_headers, _token) = create_and_set_session(&auth_state, &headers, &user)?;
    let redirect = post_login_redirect(user.role, &user.staff_roles, request.redirect.as_deref());

    Ok((
        StatusCode::OK,
        cookie_headers,
        Json(LoginResponse {
            success: true,
            redirect,
        }),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Both session cookies cleared")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    // Stateless sessions: nothing to delete server-side, but both cookie
    // names expire regardless of which scheme issued them.
    let host = cookie::request_host(&headers, auth_state.config());
    let mut response_headers = HeaderMap::new();
    for value in cookie::clear_session_cookies(auth_state.config(), &host) {
        response_headers.append(SET_COOKIE, value);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    // Missing or broken cookies are "no session", not an error; anything
    // else would leak auth state.
    let Some(token) = cookie::extract_session_token(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    match verify_session_token(auth_state.keys(), &token) {
        Ok(claims) => (
            StatusCode::OK,
            Json(SessionResponse {
                user_id: claims.sub.to_string(),
                email: claims.email,
                name: claims.name,
                role: claims.role,
                staff_roles: claims.staff_roles,
            }),
        )
            .into_response(),
        Err(_) => StatusCode::NO_CONTENT.into_response(),
    }
}
