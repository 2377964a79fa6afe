//! Unified error handling for tokengate.
//!
//! Every variant is a terminal per-request outcome. Each maps to an
//! HTTP-analog code carried in the response body, a static label for
//! metrics, and a client-facing message that never exposes internals.

use crate::db::DbError;
use crate::security::Privileges;
use thiserror::Error;

/// Errors that end a login or a gated request.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed request body")]
    MalformedRequest,

    /// Every absent required field, not just the first.
    #[error("missing fields: {}", .0.join(", "))]
    MissingField(Vec<&'static str>),

    #[error("no such principal")]
    NotFound,

    #[error("credential stored with legacy password version")]
    LegacyCredentialVersion,

    #[error("too many failed login attempts")]
    RateLimited,

    #[error("credentials rejected")]
    CredentialRejected,

    /// Holds exactly the required privileges the caller lacks.
    #[error("missing privileges: {0}")]
    AccessDenied(Privileges),

    #[error("no free token reference after {0} attempts")]
    TokenSpaceExhausted(u32),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP-analog outcome code.
    pub fn code(&self) -> u16 {
        match self {
            Self::MalformedRequest => 400,
            Self::AccessDenied(_) => 401,
            Self::CredentialRejected => 403,
            Self::NotFound => 404,
            Self::LegacyCredentialVersion => 418,
            Self::MissingField(_) => 422,
            Self::RateLimited => 429,
            Self::TokenSpaceExhausted(_) | Self::Internal(_) => 500,
        }
    }

    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedRequest => "malformed_request",
            Self::MissingField(_) => "missing_field",
            Self::NotFound => "not_found",
            Self::LegacyCredentialVersion => "legacy_credential_version",
            Self::RateLimited => "rate_limited",
            Self::CredentialRejected => "credential_rejected",
            Self::AccessDenied(_) => "access_denied",
            Self::TokenSpaceExhausted(_) => "token_space_exhausted",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message shown to the caller.
    pub fn client_message(&self) -> String {
        match self {
            Self::MalformedRequest => "Your JSON for this request is invalid.".to_string(),
            Self::MissingField(fields) => {
                format!("Missing parameters: {}.", fields.join(", "))
            }
            Self::NotFound => "No user with that username/id was found.".to_string(),
            Self::LegacyCredentialVersion => "That user still has a password in version 1. \
                The user has to log in through the website once before the API can check \
                the password."
                .to_string(),
            Self::RateLimited => {
                "You've made too many login attempts. Try again later.".to_string()
            }
            Self::CredentialRejected => "That password doesn't match!".to_string(),
            Self::AccessDenied(missing) => {
                format!("You don't have the privilege(s): {}.", missing)
            }
            Self::TokenSpaceExhausted(_) | Self::Internal(_) => {
                "An error occurred. Trying again may work. If it doesn't, contact the \
                 administrator of this instance."
                    .to_string()
            }
        }
    }

    /// Whether the failure is ours rather than the caller's.
    pub fn is_internal(&self) -> bool {
        self.code() == 500
    }
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Internal(format!("password verification failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {}", err))
    }
}
