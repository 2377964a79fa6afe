//! Token issuance.
//!
//! A secret is generated, its one-way reference checked against the store,
//! and the row inserted. The UNIQUE constraint on the reference column is
//! the real guard: two concurrent logins can both see a reference as free,
//! so a conflicting insert is treated like a collision and retried.

use crate::db::{Database, DbError};
use crate::error::AuthError;
use crate::metrics::Metrics;
use crate::security::Privileges;
use crate::security::digest::md5_hex;
use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::debug;

/// Source of fresh token secrets.
pub trait SecretSource: Send + Sync {
    fn generate(&self) -> String;
}

/// Cryptographically random alphanumeric secrets of a fixed length.
#[derive(Debug, Clone)]
pub struct RandomSecret {
    length: usize,
}

impl RandomSecret {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl SecretSource for RandomSecret {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// One-way reference under which a secret is stored and looked up.
pub fn token_reference(secret: &str) -> String {
    md5_hex(secret.as_bytes())
}

/// A freshly issued token. `secret` is the only copy of the plaintext.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub id: i64,
    pub secret: String,
    pub privileges: Privileges,
}

/// Where minted tokens are checked and stored.
///
/// `insert` must reject a reference that is already live with
/// [`DbError::ReferenceTaken`], even if `reference_exists` said it was free.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn reference_exists(&self, reference: &str) -> Result<bool, DbError>;

    async fn insert(
        &self,
        user_id: i64,
        privileges: Privileges,
        description: &str,
        reference: &str,
    ) -> Result<i64, DbError>;
}

#[async_trait]
impl TokenStore for Database {
    async fn reference_exists(&self, reference: &str) -> Result<bool, DbError> {
        self.tokens().reference_exists(reference).await
    }

    async fn insert(
        &self,
        user_id: i64,
        privileges: Privileges,
        description: &str,
        reference: &str,
    ) -> Result<i64, DbError> {
        self.tokens()
            .insert(user_id, privileges, description, reference)
            .await
    }
}

/// Generates and persists tokens for authenticated principals.
pub struct TokenMinter<'a> {
    store: &'a dyn TokenStore,
    source: &'a dyn SecretSource,
    metrics: &'a Metrics,
    max_attempts: u32,
}

impl<'a> TokenMinter<'a> {
    pub fn new(
        store: &'a dyn TokenStore,
        source: &'a dyn SecretSource,
        metrics: &'a Metrics,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            source,
            metrics,
            max_attempts,
        }
    }

    /// Issue a token for `user_id` carrying `privileges`.
    ///
    /// `privileges` must already be capped to the principal's entitlement.
    pub async fn mint(
        &self,
        user_id: i64,
        privileges: Privileges,
        description: &str,
    ) -> Result<IssuedToken, AuthError> {
        for attempt in 1..=self.max_attempts {
            let secret = self.source.generate();
            let reference = token_reference(&secret);

            if self.store.reference_exists(&reference).await? {
                self.metrics.record_token_collision();
                debug!(user_id, attempt, "Token reference already taken, regenerating");
                continue;
            }

            match self
                .store
                .insert(user_id, privileges, description, &reference)
                .await
            {
                Ok(id) => {
                    self.metrics.record_token_minted();
                    debug!(user_id, token_id = id, privileges = privileges.bits(), "Token issued");
                    return Ok(IssuedToken {
                        id,
                        secret,
                        privileges,
                    });
                }
                Err(DbError::ReferenceTaken) => {
                    self.metrics.record_token_collision();
                    debug!(user_id, attempt, "Token reference claimed concurrently, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AuthError::TokenSpaceExhausted(self.max_attempts))
    }
}
