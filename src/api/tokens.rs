//! Token endpoints.

use super::{ApiResponse, Encoded, MethodData, ResponseBase, guarded, respond};
use crate::error::AuthError;
use crate::security::Privileges;
use crate::session::{LoginOutcome, LoginRequest, login};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TokenNewResponse {
    #[serde(flatten)]
    base: ResponseBase,
    username: String,
    id: i64,
    privileges: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    banned: bool,
}

impl ApiResponse for TokenNewResponse {
    fn code(&self) -> u16 {
        self.base.code
    }
}

impl From<LoginOutcome> for TokenNewResponse {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Issued { principal, token } => Self {
                base: ResponseBase::ok(),
                username: principal.username,
                id: principal.id,
                privileges: token.privileges.bits(),
                token: Some(token.secret),
                banned: false,
            },
            LoginOutcome::Banned(principal) => Self {
                base: ResponseBase {
                    code: 200,
                    message: "That user is banned.".to_string(),
                },
                username: principal.username,
                id: principal.id,
                privileges: 0,
                token: None,
                banned: true,
            },
        }
    }
}

/// POST /api/v1/tokens/new
///
/// Exchange a password for a new token. Needs no privileges.
pub async fn token_new(State(state): State<AppState>, md: MethodData, body: Bytes) -> Encoded {
    let result = match LoginRequest::parse(&body) {
        Ok(request) => login(&state, &request).await,
        Err(e) => Err(e),
    };

    let label = match &result {
        Ok(outcome) => outcome.label(),
        Err(e) => e.error_code(),
    };
    state.metrics.record_login(label);

    respond(result.map(TokenNewResponse::from), &md.options)
}

#[derive(Debug, Serialize)]
pub struct TokenSelfResponse {
    #[serde(flatten)]
    base: ResponseBase,
    id: i64,
    user: i64,
    username: String,
    privileges: u64,
    privilege_names: Vec<&'static str>,
}

impl ApiResponse for TokenSelfResponse {
    fn code(&self) -> u16 {
        self.base.code
    }
}

/// GET /api/v1/tokens/self
///
/// Describe the presented token. Requires `Read`.
pub async fn token_self(md: MethodData) -> Encoded {
    guarded(md, Privileges::READ, |md| async move {
        let identity = md.identity;
        Ok::<_, AuthError>(TokenSelfResponse {
            base: ResponseBase::ok(),
            id: identity.token_id,
            user: identity.user_id,
            username: identity.username,
            privileges: identity.privileges.bits(),
            privilege_names: identity.privileges.names(),
        })
    })
    .await
}
