//! Typed error taxonomy for the auth subsystem.
//!
//! Credential and token failures cross the handler boundary as structured
//! JSON so callers can render field-level messages. Gate outcomes are never
//! errors; a redirect is the failure behavior there.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    /// Token hash not found in the store, or signature verification failed.
    #[error("invalid token")]
    InvalidToken,
    /// Token found but past its expiry; the stored fields were cleared on detection.
    #[error("expired token")]
    ExpiredToken,
    /// Wrong email, absent password hash, and wrong password are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    #[error("insufficient privileges")]
    Unauthorized,
    #[error("misconfigured: {0}")]
    Misconfigured(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidToken | Self::ExpiredToken => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::Misconfigured(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthenticated => "unauthenticated",
            Self::Unauthorized => "unauthorized",
            Self::Misconfigured(_) => "misconfigured",
            Self::Internal(_) => "internal",
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(err) => {
                error!("auth internal error: {err:#}");
                "internal error".to_string()
            }
            Self::Misconfigured(detail) => {
                error!("auth misconfigured: {detail}");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}
