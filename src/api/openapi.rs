//! OpenAPI document for the auth surface.

use utoipa::OpenApi;

use super::handlers::auth::types::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, MagicLinkRequest, MessageResponse,
    ResetPasswordRequest, SessionResponse,
};
use super::handlers::auth::{ErrorResponse, Role, StaffRole};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::health::health,
        super::handlers::auth::session::login,
        super::handlers::auth::session::logout,
        super::handlers::auth::session::session,
        super::handlers::auth::magic_link::request_magic_link,
        super::handlers::auth::magic_link::verify_magic_link,
        super::handlers::auth::password_reset::forgot_password,
        super::handlers::auth::password_reset::reset_password,
    ),
    components(schemas(
        ErrorResponse,
        ForgotPasswordRequest,
        LoginRequest,
        LoginResponse,
        MagicLinkRequest,
        MessageResponse,
        ResetPasswordRequest,
        Role,
        SessionResponse,
        StaffRole,
    )),
    tags(
        (name = "auth", description = "Sessions, magic links, and password resets"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
