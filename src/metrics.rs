//! Prometheus metrics collection for tokengate.
//!
//! The registry is owned by a [`Metrics`] value that lives in the request
//! context, so tests get an isolated registry per instance.
//!
//! - `tokengate_requests_total{authorised, trusted}` - Requests by resolution result
//! - `tokengate_logins_total{outcome}` - Login attempts by outcome
//! - `tokengate_tokens_minted_total` - Tokens issued
//! - `tokengate_token_collisions_total` - Regenerations due to a taken reference
//! - `tokengate_failed_attempts_recorded_total` - Failure counter increments persisted

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Fire-and-forget counter sink.
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    logins: IntCounterVec,
    tokens_minted: IntCounter,
    token_collisions: IntCounter,
    failed_attempts: IntCounter,
}

impl Metrics {
    /// Create and register all counters in a fresh registry.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        // Helper macro to create and register a metric
        macro_rules! register {
            ($init:expr) => {{
                let m = $init?;
                registry.register(Box::new(m.clone()))?;
                m
            }};
        }

        let requests = register!(IntCounterVec::new(
            Opts::new("tokengate_requests_total", "API requests by token resolution result"),
            &["authorised", "trusted"]
        ));
        let logins = register!(IntCounterVec::new(
            Opts::new("tokengate_logins_total", "Login attempts by outcome"),
            &["outcome"]
        ));
        let tokens_minted = register!(IntCounter::new(
            "tokengate_tokens_minted_total",
            "Tokens issued"
        ));
        let token_collisions = register!(IntCounter::new(
            "tokengate_token_collisions_total",
            "Token secrets regenerated because their reference was taken"
        ));
        let failed_attempts = register!(IntCounter::new(
            "tokengate_failed_attempts_recorded_total",
            "Failed login attempts persisted"
        ));

        Ok(Self {
            registry,
            requests,
            logins,
            tokens_minted,
            token_collisions,
            failed_attempts,
        })
    }

    /// Record one API request and how its token resolved.
    #[inline]
    pub fn record_request(&self, authorised: bool, trusted: bool) {
        self.requests
            .with_label_values(&[bool_label(authorised), bool_label(trusted)])
            .inc();
    }

    /// Record a login attempt by outcome label.
    #[inline]
    pub fn record_login(&self, outcome: &str) {
        self.logins.with_label_values(&[outcome]).inc();
    }

    #[inline]
    pub fn record_token_minted(&self) {
        self.tokens_minted.inc();
    }

    #[inline]
    pub fn record_token_collision(&self) {
        self.token_collisions.inc();
    }

    #[inline]
    pub fn record_failed_attempt(&self) {
        self.failed_attempts.inc();
    }

    /// Gather all metrics and encode them in Prometheus text format.
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            return String::new();
        }
        match String::from_utf8(buffer) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
                String::new()
            }
        }
    }
}

fn bool_label(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
