//! Shared request context.
//!
//! One [`AppState`] is built at startup and cloned into every request. It
//! bundles the store handle, the metrics sink, the policy knobs and the
//! secret source; there is no other global state.

use crate::config::{Config, SecurityConfig, SessionConfig};
use crate::db::Database;
use crate::metrics::Metrics;
use crate::security::LoginAttemptLimiter;
use crate::session::{RandomSecret, SecretSource, TokenMinter};
use std::sync::Arc;

/// Context shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub metrics: Arc<Metrics>,
    pub security: Arc<SecurityConfig>,
    pub session: Arc<SessionConfig>,
    secrets: Arc<dyn SecretSource>,
}

impl AppState {
    pub fn new(db: Database, metrics: Arc<Metrics>, config: &Config) -> Self {
        let secrets = Arc::new(RandomSecret::new(config.security.token_length));
        Self {
            db,
            metrics,
            security: Arc::new(config.security.clone()),
            session: Arc::new(config.session.clone()),
            secrets,
        }
    }

    /// Replace the secret generator.
    #[cfg(test)]
    pub fn with_secret_source(mut self, secrets: Arc<dyn SecretSource>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn limiter(&self) -> LoginAttemptLimiter {
        LoginAttemptLimiter::new(self.db.clone(), Arc::clone(&self.metrics), &self.security)
    }

    pub fn minter(&self) -> TokenMinter<'_> {
        TokenMinter::new(
            &self.db,
            self.secrets.as_ref(),
            &self.metrics,
            self.security.max_mint_attempts,
        )
    }
}
