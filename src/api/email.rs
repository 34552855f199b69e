//! Outbound mail abstraction.
//!
//! The auth flows await delivery before answering: a token that was
//! persisted but never mailed must surface as an error, since the user has
//! no other way to complete the flow. The trait hides how delivery happens
//! (SMTP, provider API); `LogMailSender` is the local-dev sender that logs
//! instead of sending.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[derive(Clone, Debug)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery abstraction used by the credential flows.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Deliver a message or return an error so the flow fails loudly.
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "mail send stub"
        );
        Ok(())
    }
}

pub(crate) fn magic_link_message(to: &str, link: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Your sign-in link".to_string(),
        body: format!(
            "Click to sign in: {link}\n\nThe link is valid for 15 minutes and works once."
        ),
    }
}

pub(crate) fn password_reset_message(to: &str, link: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        body: format!(
            "Click to choose a new password: {link}\n\nThe link is valid for 60 minutes and \
             works once."
        ),
    }
}
