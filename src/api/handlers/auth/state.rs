//! Auth state and configuration.

use std::sync::Arc;

use crate::api::email::MailSender;

use super::error::AuthError;
use super::secret::SessionKeys;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_MAGIC_LINK_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;

/// Deployment environment; gates the loud warnings around weak secrets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    cookie_domain: Option<String>,
    environment: Environment,
    session_ttl_seconds: i64,
    magic_link_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            cookie_domain: None,
            environment: Environment::Development,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            magic_link_ttl_seconds: DEFAULT_MAGIC_LINK_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_cookie_domain(mut self, domain: Option<String>) -> Self {
        self.cookie_domain = domain;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_magic_link_ttl_seconds(mut self, seconds: i64) -> Self {
        self.magic_link_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    /// Production needs a root cookie domain so one session spans subdomains.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.environment.is_production() && self.cookie_domain.is_none() {
            return Err(AuthError::Misconfigured(
                "cookie domain is required in production".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn cookie_domain(&self) -> Option<&str> {
        self.cookie_domain.as_deref()
    }

    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    pub(crate) const fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) const fn magic_link_ttl_seconds(&self) -> i64 {
        self.magic_link_ttl_seconds
    }

    pub(crate) const fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }
}

/// Dependencies the auth handlers and the gate share, constructed once at
/// process start and never re-created implicitly.
pub struct AuthState {
    config: AuthConfig,
    keys: SessionKeys,
    mailer: Arc<dyn MailSender>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, keys: SessionKeys, mailer: Arc<dyn MailSender>) -> Self {
        Self {
            config,
            keys,
            mailer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    pub(crate) fn mailer(&self) -> &dyn MailSender {
        self.mailer.as_ref()
    }
}
