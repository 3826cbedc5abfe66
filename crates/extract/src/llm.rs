use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LlmError;

/// Blocking-style completion endpoint: one prompt in, raw text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Sampling parameters sent alongside every prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            max_tokens: 2048,
        }
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    parameters: ModelParameters,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(flatten)]
    parameters: &'a ModelParameters,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(
        base_url: String,
        model: String,
        parameters: ModelParameters,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Transport)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            parameters,
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            parameters: &self.parameters,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(LlmError::Transport)?;

        if !response.status().is_success() {
            return Err(LlmError::Status(response.status()));
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(LlmError::Decode)?;

        Ok(ollama_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str, timeout: Duration) -> OllamaClient {
        OllamaClient::new(
            uri.to_string(),
            "deepseek-r1:8b".to_string(),
            ModelParameters::default(),
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_sends_flat_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-r1:8b",
                "prompt": "hello",
                "stream": false,
                "max_tokens": 2048
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "[]", "done": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server.uri(), Duration::from_secs(5))
            .generate("hello")
            .await
            .unwrap();
        assert_eq!(reply, "[]");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server.uri(), Duration::from_secs(5))
            .generate("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Status(s) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "[]"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri(), Duration::from_millis(200))
            .generate("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Transport(_)));
    }

    #[tokio::test]
    async fn test_unexpected_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server.uri(), Duration::from_secs(5))
            .generate("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Decode(_)));
    }
}
