//! Passwordless sign-in via one-time emailed links.
//!
//! Request: create the user on first contact, persist only the token hash
//! plus a short expiry, and email the raw token. Verify: consume the hash
//! exactly once; both the success path and the expiry-detection path clear
//! the stored fields, so a link can never be used twice.

use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum::http::HeaderMap;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::email::magic_link_message;

use super::error::{AuthError, ErrorResponse};
use super::redirect::{is_valid_redirect_path, post_login_redirect};
use super::roles::Role;
use super::session::create_and_set_session;
use super::state::AuthState;
use super::storage::{self, TokenConsume};
use super::types::{MagicLinkRequest, MessageResponse, VerifyMagicLinkQuery};
use super::utils::{generate_auth_token, hash_auth_token, normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/api/auth/magic-link",
    request_body = MagicLinkRequest,
    responses(
        (status = 200, description = "Sign-in link sent", body = MessageResponse),
        (status = 400, description = "Malformed email", body = ErrorResponse),
        (status = 500, description = "Mail dispatch failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn request_magic_link(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<MagicLinkRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::validation("missing payload"));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::validation("invalid email"));
    }

    let token = generate_auth_token()?;
    let token_hash = hash_auth_token(&token);
    storage::store_magic_link_token(
        &pool,
        &email,
        &token_hash,
        auth_state.config().magic_link_ttl_seconds(),
    )
    .await?;

    let link = build_magic_link(
        auth_state.config().base_url(),
        &token,
        request.callback_url.as_deref(),
    );

    // The token is already persisted; if the mail cannot go out the caller
    // must hear about it, not get a false success.
    if let Err(err) = auth_state.mailer().send(&magic_link_message(&email, &link)).await {
        error!("failed to send magic-link email: {err:#}");
        return Err(AuthError::Internal(err));
    }

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            success: true,
            message: "Check your email for a sign-in link.".to_string(),
        }),
    )
        .into_response())
}

/// Emailed URL carrying the raw token and, when it validates, the caller's
/// return path.
fn build_magic_link(base_url: &str, token: &str, callback_url: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    let mut link = format!("{base}/api/auth/verify-magic-link?token={token}");
    if let Some(callback) = callback_url.filter(|path| is_valid_redirect_path(path)) {
        let encoded: String = url::form_urlencoded::byte_serialize(callback.as_bytes()).collect();
        link.push_str("&callbackUrl=");
        link.push_str(&encoded);
    }
    link
}

#[utoipa::path(
    get,
    path = "/api/auth/verify-magic-link",
    params(
        ("token" = String, Query, description = "Raw token from the emailed link"),
        ("callbackUrl" = Option<String>, Query, description = "Validated return path")
    ),
    responses(
        (status = 307, description = "Session issued or bounced to login with an error code")
    ),
    tag = "auth"
)]
pub async fn verify_magic_link(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    query: Query<VerifyMagicLinkQuery>,
) -> Result<Response, AuthError> {
    let token = query.token.as_deref().map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Ok(Redirect::temporary("/login?error=invalid-link").into_response());
    }

    let token_hash = hash_auth_token(token);
    let user = match storage::consume_magic_link_token(&pool, &token_hash).await? {
        TokenConsume::Consumed(user) => user,
        TokenConsume::Expired => {
            return Ok(Redirect::temporary("/login?error=expired-link").into_response());
        }
        TokenConsume::NotFound => {
            return Ok(Redirect::temporary("/login?error=invalid-link").into_response());
        }
    };

    if matches!(user.role, Role::Organizer | Role::Admin) {
        storage::grant_starter_credits(&pool, user.id).await?;
    }

    let (cookie_headers, _token) = create_and_set_session(&auth_state, &headers, &user)?;
    let target = post_login_redirect(
        user.role,
        &user.staff_roles,
        query.callback_url.as_deref(),
    );

    let mut response = Redirect::temporary(&target).into_response();
    for value in cookie_headers.get_all(SET_COOKIE) {
        response.headers_mut().append(SET_COOKIE, value.clone());
    }
    Ok(response)
}
