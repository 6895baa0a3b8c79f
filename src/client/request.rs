//! Requests issued by the interactive client and the identity used to drop
//! responses that arrive after a newer request has started.

use std::time::Duration;

use crate::config::CLIENT_TIMEOUT_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

/// Last-request-wins bookkeeping for one widget. Requests are never cancelled;
/// a response is applied only if no newer request has begun since.
#[derive(Debug, Default)]
pub struct RequestTracker {
    issued: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> RequestId {
        self.issued += 1;
        RequestId(self.issued)
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        self.issued != 0 && id.0 == self.issued
    }
}

/// A GET against the grades API, as a path plus query string (`/api/grades?...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub path: String,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        if path.starts_with('/') {
            Self { path }
        } else {
            Self { path: format!("/{path}") }
        }
    }

    /// Full snapshot in structured form, as the table widget loads it.
    pub fn all_grades() -> Self {
        Self::new("/api/grades")
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_text(&self) -> bool {
        self.content_type.starts_with("text/plain")
    }
}

pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
        .build()
}

/// Issue the request. Any HTTP status is a response; only transport failures are errors.
pub async fn fetch(
    client: &reqwest::Client,
    base_url: &str,
    req: &ApiRequest,
) -> reqwest::Result<ApiResponse> {
    let resp = client.get(req.url(base_url)).send().await?;
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = resp.text().await?;
    Ok(ApiResponse { status, content_type, body })
}
