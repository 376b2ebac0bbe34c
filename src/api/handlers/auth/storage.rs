//! Database helpers for users and the refresh-token registry.
//!
//! Time arithmetic lives in SQL so the database clock is the single
//! authority: lock expiry, token expiry, and interval math all use `NOW()`.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::lockout::FailureOutcome;
use super::types::UserSummary;
use super::utils::is_unique_violation;
use crate::token::Role;

/// A user row with lockout state pre-computed in SQL. `locked` and
/// `lock_remaining_seconds` are derived from `locked_until` at read time so
/// callers never compare timestamps themselves.
pub(crate) struct UserRow {
    pub(super) id: Uuid,
    pub(super) email: String,
    pub(super) password_hash: String,
    pub(super) full_name: String,
    pub(super) phone: Option<String>,
    pub(super) role: Role,
    pub(super) is_active: bool,
    pub(super) is_verified: bool,
    pub(super) failed_logins: i32,
    pub(super) locked: bool,
    pub(super) lock_remaining_seconds: i64,
    pub(super) created_at: String,
    pub(super) updated_at: String,
}

const USER_COLUMNS: &str = r"
    id, email, password_hash, full_name, phone, role::TEXT AS role,
    is_active, is_verified, failed_logins,
    (locked_until IS NOT NULL AND locked_until > NOW()) AS locked,
    COALESCE(CEIL(EXTRACT(EPOCH FROM locked_until - NOW())), 0)::BIGINT
        AS lock_remaining_seconds,
    created_at::TEXT AS created_at, updated_at::TEXT AS updated_at
";

fn user_from_row(row: &sqlx::postgres::PgRow) -> Result<UserRow> {
    let role: String = row.get("role");
    let role = role
        .parse::<Role>()
        .with_context(|| format!("unknown role in users row: {role}"))?;
    Ok(UserRow {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        full_name: row.get("full_name"),
        phone: row.get("phone"),
        role,
        is_active: row.get("is_active"),
        is_verified: row.get("is_verified"),
        failed_logins: row.get("failed_logins"),
        locked: row.get("locked"),
        lock_remaining_seconds: row.get("lock_remaining_seconds"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(super) enum CreateUserOutcome {
    Created(UserRow),
    DuplicateEmail,
}

impl UserRow {
    /// Client-facing projection of the row, with no credential material.
    pub(crate) fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.to_string(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            role: self.role,
            is_active: self.is_active,
            is_verified: self.is_verified,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

impl std::fmt::Debug for UserRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never dump the password hash in logs.
        f.debug_struct("UserRow")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

pub(super) async fn create_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    full_name: &str,
    phone: Option<&str>,
    role: Role,
) -> Result<CreateUserOutcome> {
    let query = format!(
        r"
        INSERT INTO users (email, password_hash, full_name, phone, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(phone)
        .bind(role.as_str())
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateUserOutcome::Created(user_from_row(&row)?)),
        Err(err) if is_unique_violation(&err) => Ok(CreateUserOutcome::DuplicateEmail),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(super) async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    row.as_ref().map(user_from_row).transpose()
}

pub(crate) async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRow>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Record one failed login attempt. A single UPDATE increments the counter
/// and sets `locked_until` in the same statement, so concurrent failures
/// never lose an increment and exactly one of them trips the lock.
pub(super) async fn record_login_failure(
    pool: &PgPool,
    user_id: Uuid,
    threshold: i32,
    lock_duration_seconds: i64,
) -> Result<FailureOutcome> {
    let query = r"
        UPDATE users
        SET failed_logins = failed_logins + 1,
            locked_until = CASE
                WHEN failed_logins + 1 >= $2
                    THEN NOW() + ($3 * INTERVAL '1 second')
                ELSE locked_until
            END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING failed_logins,
            (locked_until IS NOT NULL AND locked_until > NOW()) AS locked
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(threshold)
        .bind(lock_duration_seconds)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to record login failure")?;

    Ok(FailureOutcome {
        failed_logins: row.get("failed_logins"),
        locked: row.get("locked"),
    })
}

/// Reset the failure counter and clear any lock after a successful login,
/// stamping `last_login` as a side effect.
pub(super) async fn clear_login_failures(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE users
        SET failed_logins = 0,
            locked_until = NULL,
            last_login = NOW(),
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
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear login failures")?;
    Ok(())
}

pub(crate) async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    full_name: Option<&str>,
    phone: Option<&str>,
) -> Result<Option<UserRow>> {
    let query = format!(
        r"
        UPDATE users
        SET full_name = COALESCE($2, full_name),
            phone = COALESCE($3, phone),
            updated_at = NOW()
        WHERE id = $1
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
        .bind(user_id)
        .bind(full_name)
        .bind(phone)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update profile")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Replace the password hash and revoke every live refresh token in one
/// transaction, so a password change invalidates all existing sessions or
/// none of them.
pub(super) async fn set_password_and_revoke_sessions(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("begin password change transaction")?;

    let query = r"
        UPDATE users
        SET password_hash = $2, updated_at = NOW()
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
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    let query = "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to revoke sessions")?;

    tx.commit().await.context("commit password change transaction")
}

/// Register a freshly minted refresh token under its `jti`.
pub(super) async fn insert_refresh_token(
    pool: &PgPool,
    jti: Uuid,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        INSERT INTO refresh_tokens (jti, user_id, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(jti)
        .bind(user_id)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert refresh token")?;
    Ok(())
}

/// Why a presented refresh token could not be redeemed, or whose it was.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum RedeemOutcome {
    Rotated { user_id: Uuid },
    Replayed,
    Expired,
    Unknown,
}

/// Redeem `jti` exactly once and register `successor_jti` in its place.
///
/// The conditional UPDATE is the linearization point: under concurrent
/// presentations of the same token, exactly one transaction matches the
/// `NOT revoked` predicate and every other one sees zero rows. Losers are
/// classified by a follow-up read: a row that exists but is revoked means
/// replay, an expired row means expiry, no row means the registry never
/// knew the token.
pub(super) async fn redeem_refresh_token(
    pool: &PgPool,
    jti: Uuid,
    successor_jti: Uuid,
    successor_ttl_seconds: i64,
) -> Result<RedeemOutcome> {
    let mut tx = pool.begin().await.context("begin refresh transaction")?;

    let query = r"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = $1 AND NOT revoked AND expires_at > NOW()
        RETURNING user_id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(jti)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to redeem refresh token")?;

    let Some(row) = row else {
        let outcome = classify_dead_token(&mut tx, jti).await?;
        let _ = tx.rollback().await;
        return Ok(outcome);
    };
    let user_id: Uuid = row.get("user_id");

    let query = r"
        INSERT INTO refresh_tokens (jti, user_id, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(successor_jti)
        .bind(user_id)
        .bind(successor_ttl_seconds)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert successor refresh token")?;

    tx.commit().await.context("commit refresh transaction")?;
    Ok(RedeemOutcome::Rotated { user_id })
}

async fn classify_dead_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    jti: Uuid,
) -> Result<RedeemOutcome> {
    let query = "SELECT revoked, expires_at <= NOW() AS expired FROM refresh_tokens WHERE jti = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(jti)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to classify refresh token")?;

    // Revoked wins over expired: a replayed token is a security signal even
    // when it has also aged out.
    Ok(match row {
        Some(row) if row.get::<bool, _>("revoked") => RedeemOutcome::Replayed,
        Some(row) if row.get::<bool, _>("expired") => RedeemOutcome::Expired,
        Some(_) => RedeemOutcome::Unknown,
        None => RedeemOutcome::Unknown,
    })
}

/// Revoke a single refresh token (logout). Idempotent.
pub(super) async fn revoke_refresh_token(pool: &PgPool, jti: Uuid, user_id: Uuid) -> Result<()> {
    let query = "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = $1 AND user_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(jti)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke refresh token")?;
    Ok(())
}

/// Delete refresh rows that expired more than `grace_seconds` ago. Expired
/// tokens are already unredeemable; this only keeps the table from growing
/// without bound.
pub(crate) async fn purge_expired_refresh_tokens(
    pool: &PgPool,
    grace_seconds: i64,
) -> Result<u64> {
    let query = r"
        DELETE FROM refresh_tokens
        WHERE expires_at < NOW() - ($1 * INTERVAL '1 second')
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(grace_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to purge expired refresh tokens")?;
    Ok(result.rows_affected())
}
