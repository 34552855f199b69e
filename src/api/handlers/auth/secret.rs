//! Signing-secret resolution and key material.
//!
//! Every signer and verifier in the process goes through the one
//! `SessionKeys` built here at startup; a second, independent secret source
//! is a correctness bug, not a variant.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use super::state::Environment;

/// Fallback so local development works out of the box. Outside development
/// its use is loudly warned about.
const DEV_FALLBACK_SECRET: &str = "usher-development-secret-do-not-deploy";
const MIN_SECRET_BYTES: usize = 32;

/// Resolve the session signing secret: explicit JWT secret, then the auth
/// secret, then the development fallback.
#[must_use]
pub fn resolve_signing_secret(
    jwt_secret: Option<&SecretString>,
    auth_secret: Option<&SecretString>,
    environment: Environment,
) -> SecretString {
    let resolved = jwt_secret.or(auth_secret);

    match resolved {
        Some(secret) => {
            if environment.is_production() && secret.expose_secret().len() < MIN_SECRET_BYTES {
                warn!(
                    "session signing secret is shorter than {MIN_SECRET_BYTES} bytes; \
                     sessions are forgeable with modest effort"
                );
            }
            SecretString::from(secret.expose_secret().to_string())
        }
        None => {
            if environment.is_production() {
                warn!(
                    "no session signing secret configured; falling back to the built-in \
                     development secret"
                );
            }
            SecretString::from(DEV_FALLBACK_SECRET.to_string())
        }
    }
}

/// Key material for the session token signer/verifier, derived once from the
/// resolved secret.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionKeys {
    #[must_use]
    pub fn from_secret(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is strict: a session is valid until its exp and not a second longer.
        validation.leeway = 0;
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }

    pub(crate) fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }

    pub(crate) fn validation(&self) -> &Validation {
        &self.validation
    }
}
