//! Refresh token storage for revocation and expiry tracking.
//!
//! Only refresh tokens are stored. Access tokens are stateless and never
//! touch the database. Revoked tokens are tombstoned through `deleted_at` and
//! stay invisible to every read until the expiry sweep purges them.

use std::future::Future;

use sqlx::sqlite::SqlitePool;

use crate::clock::unix_now;

/// A persisted refresh token.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub subject: String,
    pub token: String,
    pub expires_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl RefreshTokenRecord {
    /// Build a new live record for `subject`, valid for `lifetime_secs` from `now`.
    pub fn new(subject: &str, token: &str, now: i64, lifetime_secs: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject: subject.to_string(),
            token: token.to_string(),
            expires_at: now + lifetime_secs,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The token string is already present.
    #[error("refresh token already exists")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable CRUD over refresh token records.
pub trait RefreshTokenStore: Send + Sync {
    /// Insert a record. Fails with [`StoreError::Conflict`] on a duplicate token.
    fn create(
        &self,
        record: &RefreshTokenRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Look up a live record by its token string.
    fn get_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<RefreshTokenRecord>, StoreError>> + Send;

    /// Revoke a token. Returns whether a live record was consumed.
    fn delete_by_token(&self, token: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Revoke every live token of a subject (logout everywhere).
    fn delete_by_user(&self, subject: &str)
    -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Remove all records whose expiry has passed.
    fn delete_expired(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Revoke `old_token` and insert `replacement` atomically.
    ///
    /// Returns `false` (and inserts nothing) if `old_token` was not live. On
    /// error neither change is applied, so the old token stays usable.
    fn rotate(
        &self,
        old_token: &str,
        replacement: &RefreshTokenRecord,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

const SELECT_COLUMNS: &str =
    "SELECT id, subject, token, expires_at, created_at, updated_at, deleted_at FROM refresh_tokens";

/// SQLite-backed refresh token store.
#[derive(Clone)]
pub struct SqliteRefreshTokenStore {
    pool: SqlitePool,
}

impl SqliteRefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RefreshTokenStore for SqliteRefreshTokenStore {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        insert(&self.pool, record).await
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(&format!(
            "{} WHERE token = ? AND deleted_at IS NULL",
            SELECT_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError> {
        let now = unix_now();
        let result = sqlx::query(
            "UPDATE refresh_tokens SET deleted_at = ?, updated_at = ? WHERE token = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, subject: &str) -> Result<u64, StoreError> {
        let now = unix_now();
        let result = sqlx::query(
            "UPDATE refresh_tokens SET deleted_at = ?, updated_at = ? WHERE subject = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(subject)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(unix_now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn rotate(
        &self,
        old_token: &str,
        replacement: &RefreshTokenRecord,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let now = unix_now();
        let result = sqlx::query(
            "UPDATE refresh_tokens SET deleted_at = ?, updated_at = ? WHERE token = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(old_token)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // Dropping the transaction on error rolls the revocation back.
        insert(&mut *tx, replacement).await?;
        tx.commit().await?;
        Ok(true)
    }
}

async fn insert<'e, E>(executor: E, record: &RefreshTokenRecord) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO refresh_tokens (id, subject, token, expires_at, created_at, updated_at, deleted_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.subject)
    .bind(&record.token)
    .bind(record.expires_at)
    .bind(record.created_at)
    .bind(record.updated_at)
    .bind(record.deleted_at)
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Conflict),
        Err(e) => Err(e.into()),
    }
}
