use crate::config::Config;
use crate::core::error::ShellmancerError;
use crate::providers::LLMProvider;
use async_trait::async_trait;
use client::GeminiClient;

mod client;
mod types;

#[derive(Clone)]
pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    pub fn with_endpoint(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: GeminiClient::new(endpoint, api_key, model),
        }
    }

    pub fn from_config(config: &Config, api_key: String) -> Self {
        Self::with_endpoint(
            config.base_url().to_string(),
            api_key,
            config.model().to_string(),
        )
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn get_response(&self, prompt: &str) -> Result<String, ShellmancerError> {
        self.client.generate_content(prompt).await
    }

    fn model(&self) -> &str {
        &self.client.model
    }
}
