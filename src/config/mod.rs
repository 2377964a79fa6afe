//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, ListenConfig)
//! - [`security`]: Login and token policy (SecurityConfig, TrustedClientConfig, SessionConfig)

mod security;
mod types;

pub use security::{SecurityConfig, SessionConfig, TrustedClientConfig};
pub use types::Config;
