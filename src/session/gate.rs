//! Per-request privilege check.

use crate::error::AuthError;
use crate::security::Privileges;

use super::resolver::Identity;

/// Required bits the identity does not hold.
pub fn missing_privileges(required: Privileges, identity: &Identity) -> Privileges {
    required
        .iter()
        .filter(|bit| !identity.privileges.contains(*bit))
        .fold(Privileges::empty(), |missing, bit| missing | bit)
}

/// Admit the request, or reject it naming exactly the missing privileges.
pub fn check(required: Privileges, identity: &Identity) -> Result<(), AuthError> {
    let missing = missing_privileges(required, identity);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::AccessDenied(missing))
    }
}
