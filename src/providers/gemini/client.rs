use crate::core::error::ShellmancerError;
use crate::providers::base_client::HttpClient;
use crate::providers::gemini::types::*;

#[derive(Clone)]
pub struct GeminiClient {
    pub model: String,
    client: HttpClient,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let mut client = HttpClient::new(base_url);
        client.add_query_param("key", api_key);
        Self { client, model }
    }

    pub async fn generate_content(&self, prompt: &str) -> Result<String, ShellmancerError> {
        let payload = GeminiRequest::from_prompt(prompt);
        let response = self
            .client
            .post(
                &format!("v1/models/{}:generateContent", self.model),
                &payload,
            )
            .await?;

        let response_body: String = response.text().await?;
        parse_response(&response_body)
    }
}

pub fn parse_response(body: &str) -> Result<String, ShellmancerError> {
    let parsed: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        ShellmancerError::Serialization(format!("Failed to parse Gemini response: {}", e))
    })?;

    parsed
        .first_text()
        .map(str::to_string)
        .ok_or_else(|| ShellmancerError::Api("No valid response from Gemini".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"ls lists files"}],"role":"model"}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "ls lists files");
    }

    #[test]
    fn missing_candidates_is_an_api_error() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(parse_response(body), Err(ShellmancerError::Api(_))));
    }

    #[test]
    fn request_body_matches_the_wire_shape() {
        let payload = GeminiRequest::from_prompt("hello");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"contents": [{"parts": [{"text": "hello"}]}]})
        );
    }
}
