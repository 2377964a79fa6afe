//! Password verification for stored credentials.
//!
//! Stored hashes are bcrypt over the hex MD5 digest of the plaintext, never
//! over the plaintext itself. The pre-digest also keeps arbitrarily long
//! passwords under bcrypt's 72-byte input ceiling.

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::digest::md5_hex;

/// Credential scheme that predates bcrypt storage and cannot be checked here.
pub const LEGACY_PASSWORD_VERSION: i64 = 1;

/// A secure string that is zeroized when dropped.
///
/// Holds the plaintext password for the lifetime of a login request.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecureString(String);

impl SecureString {
    #[cfg(test)]
    pub fn new(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print actual content
        f.debug_struct("SecureString")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Verify a plaintext password against a stored bcrypt hash.
///
/// `Ok(false)` is a mismatch; `Err` means the stored hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(md5_hex(password.as_bytes()), hash)
}

/// Produce a stored hash the way account provisioning does.
#[cfg(test)]
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(md5_hex(password.as_bytes()), 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_plaintext_hash_is_not_accepted() {
        // A hash over the raw password must not verify: the digest stage is mandatory.
        let raw = bcrypt::hash("hunter2", 4).unwrap();
        assert!(!verify_password("hunter2", &raw).unwrap());
    }

    #[test]
    fn test_long_password_is_normalized() {
        let long = "x".repeat(500);
        let hash = hash_password(&long).unwrap();
        assert!(verify_password(&long, &hash).unwrap());
        assert!(!verify_password(&"x".repeat(499), &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_error() {
        assert!(verify_password("hunter2", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_secure_string_debug_hides_content() {
        let s = SecureString::new("topsecret".to_string());
        let printed = format!("{:?}", s);
        assert!(!printed.contains("topsecret"));
        assert!(printed.contains("len"));
    }
}
