//! Token repository.
//!
//! Only the one-way reference of a secret is ever stored. The `token`
//! column is UNIQUE, which makes the store the authority on collisions.

use super::DbError;
use crate::security::Privileges;
use sqlx::SqlitePool;

/// A live token joined with its owning principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token_id: i64,
    pub user_id: i64,
    pub username: String,
    /// Mask granted at issuance.
    pub privileges: Privileges,
    /// Owner's rank as of this lookup.
    pub rank: i64,
    pub banned: bool,
}

/// Repository for token operations.
pub struct TokenRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TokenRepository<'a> {
    /// Create a new token repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether a live token already uses `reference`.
    pub async fn reference_exists(&self, reference: &str) -> Result<bool, DbError> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM tokens WHERE token = ? LIMIT 1")
            .bind(reference)
            .fetch_optional(self.pool)
            .await?;

        Ok(id.is_some())
    }

    /// Persist a new token row and return its id.
    ///
    /// Fails with [`DbError::ReferenceTaken`] if another insert claimed the
    /// same reference first.
    pub async fn insert(
        &self,
        user_id: i64,
        privileges: Privileges,
        description: &str,
        reference: &str,
    ) -> Result<i64, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO tokens (user, privileges, description, token, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(privileges.bits() as i64)
        .bind(description)
        .bind(reference)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::ReferenceTaken;
            }
            DbError::from(e)
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Look up a token by reference, joined with its owner.
    pub async fn resolve(&self, reference: &str) -> Result<Option<ResolvedToken>, DbError> {
        let row = sqlx::query_as::<_, (i64, i64, String, i64, i64, bool)>(
            r#"
            SELECT t.id, t.user, u.username, t.privileges, u.rank, u.allowed
            FROM tokens t
            JOIN users u ON u.id = t.user
            WHERE t.token = ?
            LIMIT 1
            "#,
        )
        .bind(reference)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(
            |(token_id, user_id, username, privileges, rank, allowed)| ResolvedToken {
                token_id,
                user_id,
                username,
                privileges: Privileges::from_bits(privileges as u64),
                rank,
                banned: !allowed,
            },
        ))
    }

    /// Number of live tokens owned by a principal.
    #[cfg(test)]
    pub async fn count_for_user(&self, user_id: i64) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE user = ?")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
