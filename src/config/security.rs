//! Login and token policy configuration.

use serde::Deserialize;
use std::time::Duration;

/// Login and token issuance policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Logins are refused once a principal's failure count exceeds this (default: 20).
    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: i64,
    /// Optional rolling window in seconds after which a failure counter lapses.
    /// Unset means counters only clear on a successful login.
    #[serde(default)]
    pub failed_attempt_window_secs: Option<u64>,
    /// Length of generated token secrets (default: 32).
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    /// Upper bound on regenerate-on-collision attempts when minting (default: 16).
    #[serde(default = "default_max_mint_attempts")]
    pub max_mint_attempts: u32,
    /// Internal client recognised for metrics tagging only.
    #[serde(default)]
    pub trusted_client: Option<TrustedClientConfig>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            lockout_threshold: default_lockout_threshold(),
            failed_attempt_window_secs: None,
            token_length: default_token_length(),
            max_mint_attempts: default_max_mint_attempts(),
            trusted_client: None,
        }
    }
}

impl SecurityConfig {
    /// The failure window as a duration, if configured.
    pub fn failed_attempt_window(&self) -> Option<Duration> {
        self.failed_attempt_window_secs.map(Duration::from_secs)
    }

    /// Emit warnings for settings that weaken the service.
    pub fn warn_weak_settings(&self) {
        if self.token_length < 16 {
            tracing::warn!(
                token_length = self.token_length,
                "[security].token_length is short; tokens may be guessable"
            );
        }
        if self.max_mint_attempts == 0 {
            tracing::warn!("[security].max_mint_attempts is 0; every login will fail");
        }
        if let Some(trusted) = &self.trusted_client
            && trusted.key.len() < 16
        {
            tracing::warn!("[security.trusted_client].key should be at least 16 characters");
        }
    }
}

fn default_lockout_threshold() -> i64 {
    20
}

fn default_token_length() -> usize {
    32
}

fn default_max_mint_attempts() -> u32 {
    16
}

/// Shared-secret identification of an internal client.
#[derive(Debug, Clone, Deserialize)]
pub struct TrustedClientConfig {
    /// Value expected in the `H-Key` header.
    pub key: String,
    /// Value expected in the `User-Agent` header.
    pub user_agent: String,
}

/// Names of the header and cookie a token may be presented in.
///
/// The `token` and `k` query parameters are always honoured.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_header")]
    pub header: String,
    #[serde(default = "default_session_cookie")]
    pub cookie: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            header: default_session_header(),
            cookie: default_session_cookie(),
        }
    }
}

fn default_session_header() -> String {
    "X-Api-Token".to_string()
}

fn default_session_cookie() -> String {
    "rt".to_string()
}
