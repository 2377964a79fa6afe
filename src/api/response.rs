//! Response envelope and encoding.
//!
//! Every response body is a JSON object carrying its own `code`. Bodies are
//! tab-indented. A valid `callback` query parameter turns the body into a
//! JSONP script, and `pls200` forces the transport status to 200 while the
//! body keeps the real code.

use crate::error::AuthError;
use axum::http::{HeaderValue, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::error;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const JSONP_CONTENT_TYPE: &str = "application/javascript; charset=utf-8";
const MAX_CALLBACK_LEN: usize = 100;

static CALLBACK_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_$]*$").ok());

/// A serializable body that knows its outcome code.
pub trait ApiResponse: Serialize {
    fn code(&self) -> u16;
}

/// Fields every response carries.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseBase {
    pub code: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ResponseBase {
    pub fn ok() -> Self {
        Self {
            code: 200,
            message: String::new(),
        }
    }
}

impl From<&AuthError> for ResponseBase {
    fn from(err: &AuthError) -> Self {
        Self {
            code: err.code(),
            message: err.client_message(),
        }
    }
}

impl ApiResponse for ResponseBase {
    fn code(&self) -> u16 {
        self.code
    }
}

/// Per-request encoding switches taken from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseOptions {
    pub callback: Option<String>,
    pub force_ok: bool,
}

impl ResponseOptions {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        Self {
            callback: query.get("callback").filter(|cb| valid_callback(cb)).cloned(),
            force_ok: query.contains_key("pls200"),
        }
    }
}

/// Whether `name` may be used as a JSONP function name.
pub fn valid_callback(name: &str) -> bool {
    name.len() < MAX_CALLBACK_LEN && CALLBACK_RE.as_ref().is_some_and(|re| re.is_match(name))
}

/// A fully encoded response, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

/// Serialize `body` according to `options`.
pub fn encode<R: ApiResponse>(body: &R, options: &ResponseOptions) -> Encoded {
    let (code, json) = match to_tab_json(body) {
        Ok(json) => (body.code(), json),
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            (
                500,
                "{\n\t\"code\": 500,\n\t\"message\": \"An error occurred while encoding the response.\"\n}"
                    .to_string(),
            )
        }
    };

    let status = if options.force_ok { 200 } else { code };

    match &options.callback {
        Some(cb) => Encoded {
            status,
            content_type: JSONP_CONTENT_TYPE,
            body: format!("/**/ typeof {cb} === 'function' && {cb}({json});"),
        },
        None => Encoded {
            status,
            content_type: JSON_CONTENT_TYPE,
            body: json,
        },
    }
}

fn to_tab_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser)?;
    // serde_json only ever writes UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

impl IntoResponse for Encoded {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        response
    }
}
