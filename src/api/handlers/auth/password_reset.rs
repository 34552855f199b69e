//! Password reset: request a one-time emailed token, then trade it for a
//! new password.
//!
//! The request endpoint answers with the same body whether or not the
//! account exists; account enumeration is not a feature.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::email::password_reset_message;

use super::error::{AuthError, ErrorResponse};
use super::state::AuthState;
use super::storage::{self, TokenConsume};
use super::types::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest};
use super::utils::{
    generate_auth_token, hash_auth_token, hash_password, normalize_email, valid_email,
    valid_new_password,
};

fn request_acknowledged() -> Response {
    (
        StatusCode::OK,
        Json(MessageResponse {
            success: true,
            message: "If that account exists, a reset link is on its way.".to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset accepted (whether or not the account exists)", body = MessageResponse),
        (status = 400, description = "Malformed email", body = ErrorResponse),
        (status = 500, description = "Mail dispatch failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
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
    let user = storage::store_password_reset_token(
        &pool,
        &email,
        &token_hash,
        auth_state.config().reset_token_ttl_seconds(),
    )
    .await?;

    // Unknown address: acknowledge with the exact same body. The stored
    // token only exists when the account does.
    let Some(user) = user else {
        return Ok(request_acknowledged());
    };

    let base = auth_state.config().base_url().trim_end_matches('/');
    let link = format!("{base}/reset-password?token={token}");
    if let Err(err) = auth_state
        .mailer()
        .send(&password_reset_message(&user.email, &link))
        .await
    {
        error!("failed to send password-reset email: {err:#}");
        return Err(AuthError::Internal(err));
    }

    Ok(request_acknowledged())
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Invalid or expired token, or weak password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::validation("missing payload"));
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(AuthError::validation("missing token"));
    }
    if !valid_new_password(&request.new_password) {
        return Err(AuthError::validation(
            "password must be at least 8 characters",
        ));
    }

    let token_hash = hash_auth_token(token);
    let new_password_hash = hash_password(&request.new_password)?;

    match storage::consume_password_reset_token(&pool, &token_hash, &new_password_hash).await? {
        TokenConsume::Consumed(_user) => Ok((
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Password updated. You can sign in now.".to_string(),
            }),
        )
            .into_response()),
        TokenConsume::Expired => Err(AuthError::ExpiredToken),
        TokenConsume::NotFound => Err(AuthError::InvalidToken),
    }
}
