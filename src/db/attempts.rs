//! Failed login attempt counters.

use super::DbError;
use sqlx::SqlitePool;

/// Repository for per-principal failure counters.
pub struct AttemptRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AttemptRepository<'a> {
    /// Create a new attempt repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Current consecutive failure count.
    ///
    /// With `since`, a counter whose last failure is older than that
    /// timestamp has lapsed and reads as zero.
    pub async fn count(&self, user_id: i64, since: Option<i64>) -> Result<i64, DbError> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            "SELECT attempts, last_attempt_at FROM failed_attempts WHERE user = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(match row {
            Some((_, last)) if since.is_some_and(|s| last < s) => 0,
            Some((attempts, _)) => attempts,
            None => 0,
        })
    }

    /// Record one more failure and return the new count.
    ///
    /// A single upsert, so concurrent failures never lose an increment.
    /// A lapsed counter (see [`Self::count`]) restarts at one.
    pub async fn increment(
        &self,
        user_id: i64,
        now: i64,
        since: Option<i64>,
    ) -> Result<i64, DbError> {
        let attempts = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO failed_attempts (user, attempts, last_attempt_at)
            VALUES (?1, 1, ?2)
            ON CONFLICT(user) DO UPDATE SET
                attempts = CASE
                    WHEN ?3 IS NOT NULL AND failed_attempts.last_attempt_at < ?3 THEN 1
                    ELSE failed_attempts.attempts + 1
                END,
                last_attempt_at = excluded.last_attempt_at
            RETURNING attempts
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(attempts)
    }

    /// Clear the counter after a successful login.
    pub async fn reset(&self, user_id: i64) -> Result<(), DbError> {
        sqlx::query("DELETE FROM failed_attempts WHERE user = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
