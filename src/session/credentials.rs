//! Password login verification.
//!
//! Order matters: the principal must exist, must not be locked out, and
//! must not hold a legacy credential before any hashing is attempted. A
//! correct password presented while locked out is still refused.

use crate::db::{Database, Principal, Selector};
use crate::error::AuthError;
use crate::security::LoginAttemptLimiter;
use crate::security::password::{LEGACY_PASSWORD_VERSION, SecureString, verify_password};
use tracing::{debug, info};

/// Checks a presented password for one principal.
pub struct CredentialVerifier<'a> {
    db: &'a Database,
    limiter: &'a LoginAttemptLimiter,
}

impl<'a> CredentialVerifier<'a> {
    pub fn new(db: &'a Database, limiter: &'a LoginAttemptLimiter) -> Self {
        Self { db, limiter }
    }

    /// Return the principal if `password` is its current password.
    ///
    /// Banned principals are returned like any other; deciding what a
    /// banned login yields is the caller's business.
    pub async fn verify(
        &self,
        selector: Selector<'_>,
        password: &SecureString,
    ) -> Result<Principal, AuthError> {
        let credential = self
            .db
            .users()
            .find_credential(selector)
            .await?
            .ok_or(AuthError::NotFound)?;
        let user_id = credential.principal.id;

        if self.limiter.is_locked_out(user_id).await? {
            info!(user_id, "Login refused: too many failed attempts");
            return Err(AuthError::RateLimited);
        }

        if credential.password_version == LEGACY_PASSWORD_VERSION {
            debug!(user_id, "Login refused: legacy password version");
            return Err(AuthError::LegacyCredentialVersion);
        }

        // bcrypt is deliberately slow; keep it off the async workers.
        let presented = password.clone();
        let hash = credential.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || {
            verify_password(presented.as_str(), &hash)
        })
        .await??;

        if !matches {
            self.limiter.record_failure(user_id);
            info!(user_id, "Login refused: password mismatch");
            return Err(AuthError::CredentialRejected);
        }

        Ok(credential.principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::db::testing::seed_user;
    use crate::metrics::Metrics;
    use std::sync::Arc;

    fn pw(s: &str) -> SecureString {
        SecureString::new(s.to_string())
    }

    async fn setup(threshold: i64) -> (Database, LoginAttemptLimiter) {
        let db = Database::new(":memory:").await.unwrap();
        let policy = SecurityConfig {
            lockout_threshold: threshold,
            ..SecurityConfig::default()
        };
        let limiter =
            LoginAttemptLimiter::new(db.clone(), Arc::new(Metrics::new().unwrap()), &policy);
        (db, limiter)
    }

    #[tokio::test]
    async fn test_correct_password() {
        let (db, limiter) = setup(20).await;
        let uid = seed_user(&db, "alice", "hunter2", 1, 2, true).await;

        let principal = CredentialVerifier::new(&db, &limiter)
            .verify(Selector::Username("alice"), &pw("hunter2"))
            .await
            .unwrap();
        assert_eq!(principal.id, uid);
    }

    #[tokio::test]
    async fn test_unknown_selector_is_not_found() {
        let (db, limiter) = setup(20).await;
        let err = CredentialVerifier::new(&db, &limiter)
            .verify(Selector::Id(99), &pw("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
    }

    #[tokio::test]
    async fn test_mismatch_counts_failure() {
        let (db, limiter) = setup(20).await;
        let uid = seed_user(&db, "alice", "hunter2", 1, 2, true).await;

        let err = CredentialVerifier::new(&db, &limiter)
            .verify(Selector::Id(uid), &pw("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CredentialRejected));

        // The increment is detached; wait for it to land.
        for _ in 0..50 {
            if db.attempts().count(uid, None).await.unwrap() == 1 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("failed attempt was never recorded");
    }

    #[tokio::test]
    async fn test_legacy_version_never_compared() {
        let (db, limiter) = setup(20).await;
        let uid = seed_user(&db, "old", "hunter2", 1, 1, true).await;
        sqlx::query("UPDATE users SET password_hash = 'not-bcrypt' WHERE id = ?")
            .bind(uid)
            .execute(db.pool())
            .await
            .unwrap();

        // An unusable hash would be an internal error if comparison ran.
        let err = CredentialVerifier::new(&db, &limiter)
            .verify(Selector::Id(uid), &pw("hunter2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::LegacyCredentialVersion));
        assert_eq!(db.attempts().count(uid, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lockout_beats_correct_password() {
        let (db, limiter) = setup(2).await;
        let uid = seed_user(&db, "alice", "hunter2", 1, 2, true).await;
        for _ in 0..3 {
            db.attempts().increment(uid, 1, None).await.unwrap();
        }

        let err = CredentialVerifier::new(&db, &limiter)
            .verify(Selector::Id(uid), &pw("hunter2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RateLimited));
    }

    #[tokio::test]
    async fn test_lockout_checked_before_legacy_gate() {
        let (db, limiter) = setup(0).await;
        let uid = seed_user(&db, "old", "hunter2", 1, 1, true).await;
        db.attempts().increment(uid, 1, None).await.unwrap();

        let err = CredentialVerifier::new(&db, &limiter)
            .verify(Selector::Id(uid), &pw("hunter2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RateLimited));
    }
}
