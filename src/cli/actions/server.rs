use crate::api;
use crate::api::email::{LogMailSender, MailSender};
use crate::api::handlers::auth::{
    resolve_signing_secret, AuthConfig, AuthState, SessionKeys,
};
use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::Result;
use std::sync::Arc;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            // One signing secret, one key pair, resolved once at startup and
            // injected everywhere via AuthState.
            let secret = resolve_signing_secret(
                globals.jwt_secret.as_ref(),
                globals.auth_secret.as_ref(),
                globals.environment,
            );
            let keys = SessionKeys::from_secret(&secret);

            let config = AuthConfig::new(globals.base_url.clone())
                .with_environment(globals.environment)
                .with_cookie_domain(globals.cookie_domain.clone());
            config.validate()?;

            let mailer: Arc<dyn MailSender> = Arc::new(LogMailSender);
            let state = Arc::new(AuthState::new(config, keys, mailer));

            api::new(port, dsn, state).await?;
        }
    }

    Ok(())
}
