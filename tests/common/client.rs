//! HTTP client for driving the API.

use reqwest::header::HeaderMap;
use serde_json::{Value, json};

/// A decoded API response.
#[allow(dead_code)]
pub struct Reply {
    pub status: u16,
    pub content_type: String,
    pub text: String,
}

#[allow(dead_code)]
impl Reply {
    pub fn json(&self) -> anyhow::Result<Value> {
        Ok(serde_json::from_str(&self.text)?)
    }
}

pub struct TestClient {
    http: reqwest::Client,
    base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// POST a raw body to `path` (which may carry a query string).
    pub async fn post_raw(&self, path: &str, body: &str) -> anyhow::Result<Reply> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await?;
        reply(response).await
    }

    /// Log in by username and return the decoded body.
    pub async fn login(&self, username: &str, password: &str, privileges: u64) -> anyhow::Result<Reply> {
        let body = json!({
            "username": username,
            "password": password,
            "privileges": privileges,
            "description": "integration test",
        });
        self.post_raw("/api/v1/tokens/new", &body.to_string()).await
    }

    pub async fn get(&self, path: &str, headers: HeaderMap) -> anyhow::Result<Reply> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .headers(headers)
            .send()
            .await?;
        reply(response).await
    }
}

async fn reply(response: reqwest::Response) -> anyhow::Result<Reply> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let text = response.text().await?;
    Ok(Reply {
        status,
        content_type,
        text,
    })
}
