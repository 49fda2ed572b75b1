//! # User Repository
//!
//! Accounts (email, full name, password hash) and the list of signed-out
//! access tokens.
//!
//! Emails are unique regardless of case. Passwords are hashed with Argon2
//! before they reach SQL.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use moinho_core::User;

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRecord {
    id: String,
    email: String,
    full_name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn into_stored(self) -> StoredUser {
        StoredUser {
            password_hash: self.password_hash,
            user: User {
                id: self.id,
                email: self.email,
                full_name: self.full_name,
                created_at: self.created_at,
            },
        }
    }
}

/// An account together with its password hash, for sign-in.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
}

impl StoredUser {
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account.
    ///
    /// ## Errors
    /// - `UniqueViolation` when the email (in any case) is taken
    pub async fn create(&self, email: &str, full_name: &str, password: &str) -> DbResult<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let password_hash = hash_password(password)?;

        debug!(id = %id, "Creating user");

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(full_name)
        .bind(&password_hash)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(User {
                id,
                email: email.to_string(),
                full_name: full_name.to_string(),
                created_at: now,
            }),
            Err(e) => match DbError::from(e) {
                DbError::UniqueViolation { .. } => Err(DbError::duplicate("email", email)),
                other => Err(other),
            },
        }
    }

    /// Finds an account by email, ignoring case.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<StoredUser>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, full_name, password_hash, created_at
            FROM users
            WHERE email = ?1 COLLATE NOCASE
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(UserRecord::into_stored))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, full_name, password_hash, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| r.into_stored().user))
    }

    /// Records a signed-out token until its natural expiry.
    pub async fn revoke_token(&self, jti: &str, user_id: &str, expires_at: DateTime<Utc>) -> DbResult<()> {
        debug!(user_id = %user_id, "Revoking token");

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO revoked_tokens (jti, user_id, expires_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn is_revoked(&self, jti: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM revoked_tokens WHERE jti = ?1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Deletes revocations whose tokens have expired by `now`.
    ///
    /// Returns how many were removed.
    pub async fn purge_expired_revocations(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hash a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against its stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "Stored password hash does not parse");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
