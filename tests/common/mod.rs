//! Integration test common infrastructure.
//!
//! Provides utilities for spawning tokengate instances, seeding their
//! database and calling the API over HTTP.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::{SeedUser, TestServer};

/// Privilege bits as the API reports them.
#[allow(dead_code)]
pub mod bits {
    pub const READ: u64 = 1 << 0;
    pub const READ_CONFIDENTIAL: u64 = 1 << 1;
    pub const WRITE: u64 = 1 << 2;
    pub const MANAGE_BADGES: u64 = 1 << 3;
    pub const MANAGE_USER: u64 = 1 << 7;
    pub const API_META: u64 = 1 << 11;
}
