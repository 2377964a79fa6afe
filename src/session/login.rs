//! Password login: request parsing and the end-to-end issuance flow.

use crate::db::{Principal, Selector};
use crate::error::AuthError;
use crate::security::Privileges;
use crate::security::password::SecureString;
use crate::state::AppState;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use super::credentials::CredentialVerifier;
use super::minter::IssuedToken;

/// Body of a token issuance request.
///
/// `privileges` is the requested mask; it is silently capped to what the
/// principal's rank entitles, never rejected. An explicit `null` reads
/// the same as an absent key.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub password: SecureString,
    #[serde(deserialize_with = "null_as_default")]
    pub privileges: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl LoginRequest {
    /// Decode and validate a JSON body.
    ///
    /// Every absent required field is reported together.
    pub fn parse(body: &[u8]) -> Result<Self, AuthError> {
        let request: Self =
            serde_json::from_slice(body).map_err(|_| AuthError::MalformedRequest)?;

        let mut missing = Vec::new();
        if request.username.is_empty() && request.id == 0 {
            missing.push("username|id");
        }
        if request.password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(AuthError::MissingField(missing));
        }

        Ok(request)
    }

    /// The numeric id wins when both selectors are present.
    pub fn selector(&self) -> Selector<'_> {
        if self.id != 0 {
            Selector::Id(self.id)
        } else {
            Selector::Username(&self.username)
        }
    }
}

/// What a successful credential check produced.
#[derive(Debug)]
pub enum LoginOutcome {
    Issued {
        principal: Principal,
        token: IssuedToken,
    },
    /// Correct password, but the principal is banned. No token exists.
    Banned(Principal),
}

impl LoginOutcome {
    /// Label for the login metric.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Issued { .. } => "issued",
            Self::Banned(_) => "banned",
        }
    }
}

/// Verify credentials and, unless the principal is banned, mint a token.
pub async fn login(state: &AppState, request: &LoginRequest) -> Result<LoginOutcome, AuthError> {
    let limiter = state.limiter();
    let principal = CredentialVerifier::new(&state.db, &limiter)
        .verify(request.selector(), &request.password)
        .await?;

    if principal.banned {
        info!(user_id = principal.id, "Login by banned principal, no token issued");
        return Ok(LoginOutcome::Banned(principal));
    }

    let granted = Privileges::from_bits(request.privileges).cap_to_rank(principal.rank);
    let token = state
        .minter()
        .mint(principal.id, granted, &request.description)
        .await?;

    if let Err(e) = limiter.reset(principal.id).await {
        warn!(user_id = principal.id, error = %e, "Failed to reset failed login counter");
    }

    info!(
        user_id = principal.id,
        token_id = token.id,
        held = %principal.privileges,
        granted = %token.privileges,
        "Login succeeded"
    );

    Ok(LoginOutcome::Issued { principal, token })
}
