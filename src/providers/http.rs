use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::debug;

/// A named JSON API client that logs every request and response.
pub struct ApiClient {
    name: &'static str,
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(name: &'static str, base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent("kantor/1.0")
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .with_context(|| format!("Failed to build HTTP client for {name}"))?;

        Ok(ApiClient {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a GET request. Non-2xx statuses are returned as responses, not errors.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, reqwest::Error> {
        let url = self.url(path);
        debug!("[{}] GET {}", self.name, url);

        match self.client.get(&url).send().await {
            Ok(response) => {
                debug!("[{}] Response: {}", self.name, response.status());
                Ok(response)
            }
            Err(e) => {
                debug!(status = ?e.status(), "[{}] Response error: {}", self.name, e);
                Err(e)
            }
        }
    }
}
