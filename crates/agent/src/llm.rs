use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use codbot_core::config::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("prompt rendering failed: {0}")]
    Prompt(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the first candidate's text, or `None` when the model produced nothing usable.
    async fn complete(&self, prompt: &str) -> Result<Option<String>, LlmError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl GeminiClient {
    pub fn new(client: Client, config: &LlmConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

pub fn request_body(prompt: &str) -> Value {
    json!({ "contents": [{ "role": "user", "parts": [{ "text": prompt }] }] })
}

pub fn extract_candidate_text(response: &Value) -> Option<String> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed = match serde_json::from_str::<Value>(&body) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(
                    event_name = "llm.response.unparsable",
                    status = status.as_u16(),
                    error = %error,
                    "generative endpoint returned a non-JSON body"
                );
                return Ok(None);
            }
        };

        let text = extract_candidate_text(&parsed);
        if text.is_none() {
            warn!(
                event_name = "llm.response.no_candidate",
                status = status.as_u16(),
                "generative endpoint returned no candidates"
            );
        }
        Ok(text)
    }
}
