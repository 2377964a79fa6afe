//! Per-principal login lockout.
//!
//! Failures are counted in the store, not in memory, so every API process
//! sharing the database sees the same counters.
//!
//! # Consistency
//!
//! Recording a failure is fire-and-forget: it runs on a detached task and
//! the rejected response may reach the caller before the increment lands.
//! A near-simultaneous second attempt can therefore read the old count.
//! The counter itself never loses increments (single atomic upsert) and
//! only a successful login clears it.

use crate::config::SecurityConfig;
use crate::db::{Database, DbError};
use crate::metrics::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Store-backed failed login counter with a lockout threshold.
#[derive(Clone)]
pub struct LoginAttemptLimiter {
    db: Database,
    metrics: Arc<Metrics>,
    threshold: i64,
    window: Option<Duration>,
}

impl LoginAttemptLimiter {
    pub fn new(db: Database, metrics: Arc<Metrics>, policy: &SecurityConfig) -> Self {
        Self {
            db,
            metrics,
            threshold: policy.lockout_threshold,
            window: policy.failed_attempt_window(),
        }
    }

    /// True once the failure count strictly exceeds the threshold.
    pub async fn is_locked_out(&self, user_id: i64) -> Result<bool, DbError> {
        let count = self.db.attempts().count(user_id, self.window_start()).await?;
        Ok(count > self.threshold)
    }

    /// Count one failure on a detached task.
    ///
    /// The handle is only useful to tests; callers normally drop it.
    pub fn record_failure(&self, user_id: i64) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let now = chrono::Utc::now().timestamp();
            match limiter
                .db
                .attempts()
                .increment(user_id, now, limiter.window_start())
                .await
            {
                Ok(attempts) => {
                    limiter.metrics.record_failed_attempt();
                    debug!(user_id, attempts, "Recorded failed login attempt");
                }
                Err(e) => {
                    warn!(user_id, error = %e, "Failed to record failed login attempt");
                }
            }
        })
    }

    /// Clear the counter after a successful login.
    pub async fn reset(&self, user_id: i64) -> Result<(), DbError> {
        self.db.attempts().reset(user_id).await
    }

    fn window_start(&self) -> Option<i64> {
        self.window
            .map(|w| chrono::Utc::now().timestamp() - w.as_secs() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::seed_user;

    fn limiter(db: &Database, threshold: i64) -> LoginAttemptLimiter {
        let policy = SecurityConfig {
            lockout_threshold: threshold,
            ..SecurityConfig::default()
        };
        LoginAttemptLimiter::new(db.clone(), Arc::new(Metrics::new().unwrap()), &policy)
    }

    #[tokio::test]
    async fn test_lockout_only_after_exceeding_threshold() {
        let db = Database::new(":memory:").await.unwrap();
        let uid = seed_user(&db, "alice", "pw", 1, 2, true).await;
        let limiter = limiter(&db, 3);

        for _ in 0..3 {
            limiter.record_failure(uid).await.unwrap();
        }
        // Exactly at the threshold is still allowed.
        assert!(!limiter.is_locked_out(uid).await.unwrap());

        limiter.record_failure(uid).await.unwrap();
        assert!(limiter.is_locked_out(uid).await.unwrap());

        limiter.reset(uid).await.unwrap();
        assert!(!limiter.is_locked_out(uid).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_all_counted() {
        let db = Database::new(":memory:").await.unwrap();
        let uid = seed_user(&db, "alice", "pw", 1, 2, true).await;
        let limiter = limiter(&db, 20);

        let handles: Vec<_> = (0..10).map(|_| limiter.record_failure(uid)).collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(db.attempts().count(uid, None).await.unwrap(), 10);
    }
}
