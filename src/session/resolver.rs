//! Bearer token resolution.
//!
//! A candidate token is taken from the first non-empty source, in order:
//! the session header, the `token` query parameter, the `k` query
//! parameter, the session cookie. Sources are never merged. A missing,
//! unknown or revoked token all resolve to the anonymous identity, so the
//! response never reveals whether a presented token was ever valid.

use crate::config::{SessionConfig, TrustedClientConfig};
use crate::db::{Database, DbError};
use crate::security::Privileges;
use axum::http::HeaderMap;
use axum::http::header::{COOKIE, USER_AGENT};
use std::collections::HashMap;
use subtle::ConstantTimeEq;

use super::minter::token_reference;

/// Header carrying the trusted internal client's shared secret.
pub const TRUSTED_KEY_HEADER: &str = "H-Key";

/// Who is making a request, as far as the presented token says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub token_id: i64,
    pub user_id: i64,
    pub username: String,
    /// Effective granted mask. Empty for the anonymous identity.
    pub privileges: Privileges,
}

impl Identity {
    /// The unauthenticated identity: no principal, no privileges.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id != 0
    }
}

/// Pick the candidate token from a request.
pub fn extract_token(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    session: &SessionConfig,
) -> Option<String> {
    let from_header = headers
        .get(session.header.as_str())
        .and_then(|v| v.to_str().ok());

    from_header
        .into_iter()
        .chain(query.get("token").map(String::as_str))
        .chain(query.get("k").map(String::as_str))
        .chain(cookie_value(headers, &session.cookie))
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
}

fn cookie_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

/// Resolve a candidate token to an identity.
///
/// A token whose owner is banned resolves as anonymous. The granted mask
/// is re-capped to the owner's current entitlement, so a demotion shrinks
/// tokens issued before it.
pub async fn resolve(db: &Database, candidate: Option<&str>) -> Result<Identity, DbError> {
    let Some(token) = candidate else {
        return Ok(Identity::anonymous());
    };

    let Some(row) = db.tokens().resolve(&token_reference(token)).await? else {
        return Ok(Identity::anonymous());
    };

    if row.banned {
        return Ok(Identity::anonymous());
    }

    Ok(Identity {
        token_id: row.token_id,
        user_id: row.user_id,
        username: row.username,
        privileges: row.privileges.cap_to_rank(row.rank),
    })
}

/// Whether the request comes from the configured internal client.
///
/// Advisory only: used to tag metrics, never to grant anything.
pub fn is_trusted_client(headers: &HeaderMap, trusted: Option<&TrustedClientConfig>) -> bool {
    let Some(trusted) = trusted else {
        return false;
    };

    let key = headers
        .get(TRUSTED_KEY_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    let agent = headers
        .get(USER_AGENT)
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    let key_matches: bool = key.ct_eq(trusted.key.as_bytes()).into();
    key_matches && !trusted.key.is_empty() && agent == trusted.user_agent.as_bytes()
}
