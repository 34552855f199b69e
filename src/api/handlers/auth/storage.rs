//! Credential-store queries.
//!
//! Single-use tokens follow one discipline everywhere: only the hash and an
//! expiry are stored, and consumption is a compare-and-clear UPDATE so a
//! concurrent duplicate request can never consume the same token twice.
//! Detection of an expired token clears the stored fields as a side effect;
//! a token is never left dangling for a second attempt.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::roles::{Role, StaffRole};
use super::utils::is_unique_violation;

/// Starter balance granted once to organizer/admin accounts on their first
/// verified magic-link sign-in.
const STARTER_CREDITS: i64 = 10;

const USER_COLUMNS: &str =
    "id, email, name, password_hash, role, staff_roles, vendor, restaurateur, email_verified";

/// A user as the auth flows see it.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub staff_roles: Vec<StaffRole>,
    pub vendor: bool,
    pub restaurateur: bool,
    pub email_verified: bool,
}

impl UserRecord {
    fn from_row(row: &sqlx::postgres::PgRow) -> Self {
        let staff_roles: Vec<String> = row.get("staff_roles");
        Self {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            password_hash: row.get("password_hash"),
            role: Role::parse(row.get::<String, _>("role").as_str()),
            staff_roles: staff_roles
                .iter()
                .filter_map(|tag| StaffRole::parse(tag))
                .collect(),
            vendor: row.get("vendor"),
            restaurateur: row.get("restaurateur"),
            email_verified: row.get("email_verified"),
        }
    }
}

/// Outcome of a single-use token lookup.
#[derive(Debug)]
pub(super) enum TokenConsume {
    /// Token matched and was cleared; the user is returned for session issuance.
    Consumed(UserRecord),
    /// Token matched but was stale; the fields were cleared on detection.
    Expired,
    /// No record holds this hash.
    NotFound,
}

pub(super) async fn lookup_user_by_email(
    pool: &PgPool,
    email_normalized: &str,
) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email_normalized)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| UserRecord::from_row(&row)))
}

/// Store a magic-link token for the address, creating the user on first
/// contact (role `user`, email unverified). The insert race on a duplicate
/// email is resolved by falling back to the existing row.
pub(super) async fn store_magic_link_token(
    pool: &PgPool,
    email_normalized: &str,
    token_hash: &[u8],
    ttl_seconds: i64,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin magic-link transaction")?;

    let query = "SELECT id FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let existing = sqlx::query(query)
        .bind(email_normalized)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lookup user for magic link")?;

    let user_id: Uuid = match existing {
        Some(row) => row.get("id"),
        None => {
            let query = "INSERT INTO users (email, role) VALUES ($1, 'user') RETURNING id";
            let span = tracing::info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "INSERT",
                db.statement = query
            );
            let inserted = sqlx::query(query)
                .bind(email_normalized)
                .fetch_one(&mut *tx)
                .instrument(span)
                .await;
            match inserted {
                Ok(row) => row.get("id"),
                Err(err) if is_unique_violation(&err) => {
                    // Lost the create race; the other writer's row wins.
                    let query = "SELECT id FROM users WHERE email = $1";
                    let row = sqlx::query(query)
                        .bind(email_normalized)
                        .fetch_one(&mut *tx)
                        .await
                        .context("failed to re-read user after insert race")?;
                    row.get("id")
                }
                Err(err) => return Err(err).context("failed to create magic-link user"),
            }
        }
    };

    let query = r"
        UPDATE users
        SET magic_link_token_hash = $2,
            magic_link_expires_at = NOW() + ($3 * INTERVAL '1 second'),
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to store magic-link token")?;

    tx.commit().await.context("commit magic-link transaction")?;
    Ok(())
}

/// Consume a magic-link token exactly once. Success marks the email
/// verified and clears the token fields in the same statement.
pub(super) async fn consume_magic_link_token(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<TokenConsume> {
    let mut tx = pool.begin().await.context("begin verify transaction")?;

    let query = format!(
        r"
        UPDATE users
        SET magic_link_token_hash = NULL,
            magic_link_expires_at = NULL,
            email_verified = TRUE,
            updated_at = NOW()
        WHERE magic_link_token_hash = $1
          AND magic_link_expires_at > NOW()
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume magic-link token")?;

    if let Some(row) = row {
        let user = UserRecord::from_row(&row);
        tx.commit().await.context("commit verify transaction")?;
        return Ok(TokenConsume::Consumed(user));
    }

    let outcome = clear_expired_token(
        &mut tx,
        "magic_link_token_hash",
        "magic_link_expires_at",
        token_hash,
    )
    .await?;
    tx.commit().await.context("commit verify transaction")?;
    Ok(outcome)
}

/// Store a password-reset token; returns the user when the account exists.
pub(super) async fn store_password_reset_token(
    pool: &PgPool,
    email_normalized: &str,
    token_hash: &[u8],
    ttl_seconds: i64,
) -> Result<Option<UserRecord>> {
    let query = format!(
        r"
        UPDATE users
        SET password_reset_token_hash = $2,
            password_reset_expires_at = NOW() + ($3 * INTERVAL '1 second'),
            updated_at = NOW()
        WHERE email = $1
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email_normalized)
        .bind(token_hash)
        .bind(ttl_seconds)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to store password-reset token")?;

    Ok(row.map(|row| UserRecord::from_row(&row)))
}

/// Consume a password-reset token exactly once, replacing the password hash
/// and marking the email verified (the token proves address ownership).
pub(super) async fn consume_password_reset_token(
    pool: &PgPool,
    token_hash: &[u8],
    new_password_hash: &str,
) -> Result<TokenConsume> {
    let mut tx = pool.begin().await.context("begin reset transaction")?;

    let query = format!(
        r"
        UPDATE users
        SET password_hash = $2,
            password_reset_token_hash = NULL,
            password_reset_expires_at = NULL,
            email_verified = TRUE,
            updated_at = NOW()
        WHERE password_reset_token_hash = $1
          AND password_reset_expires_at > NOW()
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(token_hash)
        .bind(new_password_hash)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume password-reset token")?;

    if let Some(row) = row {
        let user = UserRecord::from_row(&row);
        tx.commit().await.context("commit reset transaction")?;
        return Ok(TokenConsume::Consumed(user));
    }

    let outcome = clear_expired_token(
        &mut tx,
        "password_reset_token_hash",
        "password_reset_expires_at",
        token_hash,
    )
    .await?;
    tx.commit().await.context("commit reset transaction")?;
    Ok(outcome)
}

/// Second half of the consume discipline: a hash that matched nothing live
/// is either stale (clear it now, report expired) or unknown.
async fn clear_expired_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    hash_column: &str,
    expiry_column: &str,
    token_hash: &[u8],
) -> Result<TokenConsume> {
    let query = format!(
        r"
        UPDATE users
        SET {hash_column} = NULL,
            {expiry_column} = NULL,
            updated_at = NOW()
        WHERE {hash_column} = $1
        RETURNING id
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(token_hash)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to clear expired token")?;

    if row.is_some() {
        Ok(TokenConsume::Expired)
    } else {
        Ok(TokenConsume::NotFound)
    }
}

/// One-time starter credits for organizer/admin accounts; the NULL guard
/// makes the grant idempotent.
pub(super) async fn grant_starter_credits(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE users
        SET credits = $2,
            updated_at = NOW()
        WHERE id = $1
          AND credits IS NULL
          AND role IN ('organizer', 'admin')
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(STARTER_CREDITS)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to grant starter credits")?;
    Ok(())
}
