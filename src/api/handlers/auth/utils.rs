//! Small helpers for auth validation, token handling, and password hashing.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng as HashOsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// New passwords only need a length floor; composition rules stay in the UI.
pub(super) fn valid_new_password(password: &str) -> bool {
    password.len() >= MIN_PASSWORD_LENGTH
}

/// Create a new single-use token for magic-link and reset emails.
///
/// Returned token is only sent to the user; we store a hash in the database.
pub(super) fn generate_auth_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate auth token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a single-use token so raw values never touch the database.
/// The hash is used for lookups when the token comes back.
pub(super) fn hash_auth_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Hash a password into a PHC string for storage.
pub(super) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut HashOsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Verify a submitted password against a stored PHC string.
/// Unparseable stored hashes count as a mismatch, not an error.
pub(super) fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn valid_new_password_enforces_length_floor() {
        assert!(valid_new_password("longenough"));
        assert!(!valid_new_password("short"));
    }

    #[test]
    fn generate_auth_token_round_trip() {
        let decoded_len = generate_auth_token()
            .ok()
            .and_then(|token| URL_SAFE_NO_PAD.decode(token.as_bytes()).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn hash_auth_token_stable() {
        let first = hash_auth_token("token");
        let second = hash_auth_token("token");
        let different = hash_auth_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
    }

    #[test]
    fn password_hash_round_trip() -> anyhow::Result<()> {
        let hash = hash_password("CorrectHorseBatteryStaple")?;
        assert!(verify_password("CorrectHorseBatteryStaple", &hash));
        assert!(!verify_password("wrong-password", &hash));
        Ok(())
    }

    #[test]
    fn verify_password_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
