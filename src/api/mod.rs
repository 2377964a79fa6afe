//! HTTP API surface.
//!
//! Every handler starts from [`MethodData`]: the resolved identity of the
//! caller plus the encoding switches from the query string. Handlers that
//! need privileges go through [`guarded`], which runs the privilege gate
//! before any handler logic.

mod response;
mod tokens;

pub use response::{ApiResponse, Encoded, ResponseBase, ResponseOptions, encode};

use crate::error::AuthError;
use crate::security::Privileges;
use crate::session::{Identity, gate, resolver};
use crate::state::AppState;
use async_trait::async_trait;
use axum::Router;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use axum::routing::{get, post};
use std::collections::HashMap;
use std::convert::Infallible;
use tracing::{debug, error, warn};

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/tokens/new", post(tokens::token_new))
        .route("/api/v1/tokens", post(tokens::token_new))
        .route("/api/v1/tokens/self", get(tokens::token_self))
        .fallback(not_found)
        .with_state(state)
}

/// Per-request context handed to every handler.
#[derive(Debug, Clone)]
pub struct MethodData {
    pub identity: Identity,
    pub options: ResponseOptions,
}

impl MethodData {
    /// Resolve the caller and read the encoding switches.
    ///
    /// Resolution never fails the request: a store error is logged and the
    /// caller is treated as anonymous.
    pub async fn from_request(state: &AppState, uri: &Uri, headers: &HeaderMap) -> Self {
        let query = query_params(uri);

        let candidate = resolver::extract_token(headers, &query, &state.session);
        let identity = match resolver::resolve(&state.db, candidate.as_deref()).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Token resolution failed, treating caller as anonymous");
                Identity::anonymous()
            }
        };

        let trusted = resolver::is_trusted_client(headers, state.security.trusted_client.as_ref());
        state
            .metrics
            .record_request(identity.is_authenticated(), trusted);

        Self {
            identity,
            options: ResponseOptions::from_query(&query),
        }
    }
}

/// Run `handler` only if the caller holds every privilege in `required`.
pub async fn guarded<R, F, Fut>(md: MethodData, required: Privileges, handler: F) -> Encoded
where
    R: ApiResponse,
    F: FnOnce(MethodData) -> Fut,
    Fut: Future<Output = Result<R, AuthError>>,
{
    if let Err(e) = gate::check(required, &md.identity) {
        return respond::<R>(Err(e), &md.options);
    }
    let options = md.options.clone();
    respond(handler(md).await, &options)
}

/// Encode a handler result, logging failures that are ours.
pub fn respond<R: ApiResponse>(result: Result<R, AuthError>, options: &ResponseOptions) -> Encoded {
    match result {
        Ok(body) => encode(&body, options),
        Err(e) => {
            if e.is_internal() {
                error!(error = %e, "Request failed");
            }
            encode(&ResponseBase::from(&e), options)
        }
    }
}

/// Decode the query string leniently.
///
/// A malformed escape decodes lossily instead of discarding the whole
/// query, and the first occurrence of a repeated key wins.
pub fn query_params(uri: &Uri) -> HashMap<String, String> {
    let Some(raw) = uri.query() else {
        return HashMap::new();
    };

    let mut params = HashMap::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        if !params.contains_key(&*key) {
            params.insert(key.into_owned(), value.into_owned());
        }
    }
    if params.is_empty() && !raw.is_empty() {
        debug!(query_len = raw.len(), "Query string carried no parameters");
    }
    params
}

#[async_trait]
impl FromRequestParts<AppState> for MethodData {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self::from_request(state, &parts.uri, &parts.headers).await)
    }
}

async fn not_found(uri: Uri) -> Encoded {
    let query = query_params(&uri);
    let body = ResponseBase {
        code: 404,
        message: "Resource not found.".to_string(),
    };
    encode(&body, &ResponseOptions::from_query(&query))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(uri: &str) -> HashMap<String, String> {
        query_params(&uri.parse().unwrap())
    }

    #[test]
    fn test_bad_escape_keeps_other_parameters() {
        let query = parse("/api/v1/tokens/self?callback=cb_1&k=%zz&pls200");
        assert_eq!(query.get("callback").map(String::as_str), Some("cb_1"));
        assert_eq!(query.get("k").map(String::as_str), Some("%zz"));
        assert!(query.contains_key("pls200"));

        let options = ResponseOptions::from_query(&query);
        assert_eq!(options.callback.as_deref(), Some("cb_1"));
        assert!(options.force_ok);
    }

    #[test]
    fn test_first_repeated_key_wins() {
        let query = parse("/x?token=first&token=second&k=a%20b");
        assert_eq!(query.get("token").map(String::as_str), Some("first"));
        assert_eq!(query.get("k").map(String::as_str), Some("a b"));
    }

    #[test]
    fn test_no_query_is_empty() {
        assert!(parse("/api/v1/tokens/self").is_empty());
    }
}
