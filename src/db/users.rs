//! Principal lookups.
//!
//! Rows are provisioned and edited by external account-management flows;
//! this repository only reads them.

use super::DbError;
use crate::security::Privileges;
use sqlx::SqlitePool;

/// An account capable of authenticating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    /// Ordinal trust tier; determines the privilege entitlement.
    pub rank: i64,
    pub privileges: Privileges,
    pub banned: bool,
}

/// A principal together with its stored password material.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub principal: Principal,
    pub password_hash: String,
    pub password_version: i64,
}

/// How a login request names its principal. The numeric id wins when both are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    Id(i64),
    Username(&'a str),
}

type UserRow = (i64, String, i64, i64, String, i64, bool);

/// Repository for principal lookups.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve exactly one principal and its credential by selector.
    pub async fn find_credential(
        &self,
        selector: Selector<'_>,
    ) -> Result<Option<StoredCredential>, DbError> {
        let row = match selector {
            Selector::Id(id) => {
                sqlx::query_as::<_, UserRow>(
                    r#"
                    SELECT id, username, rank, privileges, password_hash, password_version, allowed
                    FROM users
                    WHERE id = ?
                    LIMIT 1
                    "#,
                )
                .bind(id)
                .fetch_optional(self.pool)
                .await?
            }
            Selector::Username(name) => {
                sqlx::query_as::<_, UserRow>(
                    r#"
                    SELECT id, username, rank, privileges, password_hash, password_version, allowed
                    FROM users
                    WHERE username = ? COLLATE NOCASE
                    LIMIT 1
                    "#,
                )
                .bind(name)
                .fetch_optional(self.pool)
                .await?
            }
        };

        Ok(row.map(
            |(id, username, rank, privileges, password_hash, password_version, allowed)| {
                StoredCredential {
                    principal: Principal {
                        id,
                        username,
                        rank,
                        privileges: Privileges::from_bits(privileges as u64),
                        banned: !allowed,
                    },
                    password_hash,
                    password_version,
                }
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::db::testing::seed_user;

    #[tokio::test]
    async fn test_find_by_id_and_username() {
        let db = Database::new(":memory:").await.unwrap();
        let id = seed_user(&db, "Alice", "pw", 3, 2, true).await;

        let by_id = db
            .users()
            .find_credential(Selector::Id(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.principal.username, "Alice");
        assert_eq!(by_id.principal.rank, 3);
        assert_eq!(by_id.password_version, 2);
        assert!(!by_id.principal.banned);

        let by_name = db
            .users()
            .find_credential(Selector::Username("alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.principal, by_id.principal);
    }

    #[tokio::test]
    async fn test_missing_principal_is_none() {
        let db = Database::new(":memory:").await.unwrap();
        assert!(
            db.users()
                .find_credential(Selector::Id(42))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            db.users()
                .find_credential(Selector::Username("nobody"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_banned_flag_from_allowed_column() {
        let db = Database::new(":memory:").await.unwrap();
        let id = seed_user(&db, "mallory", "pw", 1, 2, false).await;
        let cred = db
            .users()
            .find_credential(Selector::Id(id))
            .await
            .unwrap()
            .unwrap();
        assert!(cred.principal.banned);
    }
}
