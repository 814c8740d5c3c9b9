use crate::core::error::ShellmancerError;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;

/// Thin JSON-over-HTTP client shared by providers.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    query_params: Vec<(String, String)>,
}

impl HttpClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            query_params: Vec::new(),
        }
    }

    pub fn add_query_param(&mut self, key: &str, value: String) {
        self.query_params.push((key.to_string(), value));
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POSTs `payload` and turns any non-success status into an API error
    /// carrying the response body.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Response, ShellmancerError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .query(&self.query_params)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShellmancerError::Api(format!("{}: {}", status, body.trim())));
        }

        Ok(response)
    }
}
