//! Signed session claims: the full, immutable payload of a session token.
//!
//! Sessions are stateless; validity is purely cryptographic (signature +
//! expiry), so everything the gate authorizes on rides in the payload. The
//! payload never contains secrets.

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AuthError;
use super::roles::{Role, StaffRole};
use super::secret::SessionKeys;
use super::storage::UserRecord;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub staff_roles: Vec<StaffRole>,
    #[serde(default)]
    pub vendor: bool,
    #[serde(default)]
    pub restaurateur: bool,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Build claims for a freshly authenticated user with a fixed lifetime
    /// from issuance.
    #[must_use]
    pub fn for_user(user: &UserRecord, ttl_seconds: i64) -> Self {
        let iat = Utc::now().timestamp();
        Self {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            staff_roles: user.staff_roles.clone(),
            vendor: user.vendor,
            restaurateur: user.restaurateur,
            iat,
            exp: iat + ttl_seconds,
        }
    }
}

/// Sign session claims into a compact token.
pub fn create_session_token(keys: &SessionKeys, claims: &SessionClaims) -> Result<String, AuthError> {
    encode(&Header::default(), claims, keys.encoding())
        .map_err(|err| AuthError::Internal(anyhow::anyhow!("failed to sign session token: {err}")))
}

/// Verify a session token. Any ambiguity resolves to `InvalidToken`; only a
/// good signature with a stale `exp` reports `ExpiredToken`.
pub fn verify_session_token(keys: &SessionKeys, token: &str) -> Result<SessionClaims, AuthError> {
    decode::<SessionClaims>(token, keys.decoding(), keys.validation())
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_keys() -> SessionKeys {
        SessionKeys::from_secret(&SecretString::from(
            "test-secret-for-unit-tests-minimum-32-chars".to_string(),
        ))
    }

    fn claims_with_exp(iat: i64, exp: i64) -> SessionClaims {
        SessionClaims {
            sub: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: Role::Organizer,
            staff_roles: vec![StaffRole::Staff],
            vendor: false,
            restaurateur: false,
            iat,
            exp,
        }
    }

    #[test]
    fn sign_and_verify_round_trip() -> anyhow::Result<()> {
        let keys = test_keys();
        let now = Utc::now().timestamp();
        let claims = claims_with_exp(now, now + 3600);

        let token = create_session_token(&keys, &claims)?;
        let verified = verify_session_token(&keys, &token)?;
        assert_eq!(verified, claims);
        Ok(())
    }

    #[test]
    fn verification_fails_strictly_after_expiry() -> anyhow::Result<()> {
        let keys = test_keys();
        let now = Utc::now().timestamp();
        let claims = claims_with_exp(now - 7200, now - 120);

        let token = create_session_token(&keys, &claims)?;
        let err = verify_session_token(&keys, &token).expect_err("stale token must fail");
        assert!(matches!(err, AuthError::ExpiredToken));
        Ok(())
    }

    #[test]
    fn tampered_token_is_invalid() -> anyhow::Result<()> {
        let keys = test_keys();
        let now = Utc::now().timestamp();
        let claims = claims_with_exp(now, now + 3600);

        let mut token = create_session_token(&keys, &claims)?;
        token.replace_range(token.len() - 2.., "xx");
        let err = verify_session_token(&keys, &token).expect_err("tampered token must fail");
        assert!(matches!(err, AuthError::InvalidToken));
        Ok(())
    }

    #[test]
    fn token_from_a_different_secret_is_invalid() -> anyhow::Result<()> {
        let keys = test_keys();
        let other = SessionKeys::from_secret(&SecretString::from(
            "another-secret-for-unit-tests-32-chars-min".to_string(),
        ));
        let now = Utc::now().timestamp();
        let claims = claims_with_exp(now, now + 3600);

        let token = create_session_token(&other, &claims)?;
        let err = verify_session_token(&keys, &token).expect_err("wrong key must fail");
        assert!(matches!(err, AuthError::InvalidToken));
        Ok(())
    }

    #[test]
    fn staff_roles_default_to_empty_when_absent() -> anyhow::Result<()> {
        let keys = test_keys();
        let now = Utc::now().timestamp();
        let mut claims = claims_with_exp(now, now + 3600);
        claims.staff_roles = Vec::new();

        let token = create_session_token(&keys, &claims)?;
        let verified = verify_session_token(&keys, &token)?;
        assert!(verified.staff_roles.is_empty());
        Ok(())
    }
}
