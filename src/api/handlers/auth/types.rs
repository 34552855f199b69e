//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::{Role, StaffRole};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Optional return path captured by the gate's login bounce.
    pub redirect: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    /// Where the caller should land, resolved through the post-login funnel.
    pub redirect: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MagicLinkRequest {
    pub email: String,
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

/// Query half of the emailed magic-link URL.
#[derive(Deserialize, Debug)]
pub struct VerifyMagicLinkQuery {
    pub token: Option<String>,
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Constant-shape acknowledgement used by the flows that must not reveal
/// whether an account exists.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub staff_roles: Vec<StaffRole>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn magic_link_request_uses_camel_case_callback() -> Result<()> {
        let request: MagicLinkRequest = serde_json::from_str(
            r#"{"email":"alice@example.com","callbackUrl":"/tickets/42"}"#,
        )?;
        assert_eq!(request.email, "alice@example.com");
        assert_eq!(request.callback_url.as_deref(), Some("/tickets/42"));
        Ok(())
    }

    #[test]
    fn reset_request_uses_camel_case_password() -> Result<()> {
        let request: ResetPasswordRequest =
            serde_json::from_str(r#"{"token":"raw","newPassword":"longenough"}"#)?;
        assert_eq!(request.token, "raw");
        assert_eq!(request.new_password, "longenough");
        Ok(())
    }

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            email: "bob@example.com".to_string(),
            password: "hunter22".to_string(),
            redirect: Some("/organizer/events".to_string()),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "bob@example.com");
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.redirect.as_deref(), Some("/organizer/events"));
        Ok(())
    }

    #[test]
    fn session_response_serializes_roles() -> Result<()> {
        let response = SessionResponse {
            user_id: "id".to_string(),
            email: "carol@example.com".to_string(),
            name: "Carol".to_string(),
            role: Role::Organizer,
            staff_roles: vec![StaffRole::Staff],
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(value["role"], "organizer");
        assert_eq!(value["staff_roles"][0], "STAFF");
        Ok(())
    }
}
