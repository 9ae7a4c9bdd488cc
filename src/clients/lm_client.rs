//! Client for an OpenAI-compatible chat completion endpoint (LM Studio).
//! The engine treats the reply as opaque text; everything the model is
//! allowed to state as fact travels in the injected fact block.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;
use crate::models::conversation::ChatTurn;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the ordered turn sequence and returns the assistant's free text.
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: i32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

pub struct LmStudioClient {
    base_url: String,
    api_key: String,
    fallback_model: String,
    http: reqwest::Client,
}

impl LmStudioClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            api_key: api_key.into(),
            fallback_model: model.into(),
            http: reqwest::Client::new(),
        }
    }

    fn models_url(&self) -> String {
        if self.base_url.ends_with("/v1") {
            format!("{}/models", self.base_url)
        } else {
            format!("{}/v1/models", self.base_url)
        }
    }

    fn completions_url(&self) -> String {
        if self.base_url.ends_with("/v1") {
            format!("{}/chat/completions", self.base_url)
        } else {
            format!("{}/v1/chat/completions", self.base_url)
        }
    }

    /// LM Studio serves whatever model is currently loaded; asking the
    /// server beats trusting stale configuration. Falls back to the
    /// configured model name when discovery fails.
    async fn runtime_model(&self) -> String {
        let discovered = async {
            let response = self
                .http
                .get(self.models_url())
                .timeout(Duration::from_secs(1))
                .send()
                .await
                .ok()?;
            let list: ModelList = response.json().await.ok()?;
            list.data.into_iter().next().map(|m| m.id)
        }
        .await;
        match discovered {
            Some(id) => id,
            None => {
                tracing::debug!(fallback = %self.fallback_model, "model discovery failed");
                self.fallback_model.clone()
            }
        }
    }
}

#[async_trait]
impl CompletionClient for LmStudioClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError> {
        let model = self.runtime_model().await;
        let request = CompletionRequest {
            model: &model,
            messages: turns
                .iter()
                .map(|t| WireMessage {
                    role: t.role.as_str(),
                    content: &t.content,
                })
                .collect(),
            temperature: 0.7,
            max_tokens: -1,
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(300))
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status(status.as_u16()));
        }
        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(CompletionError::Empty)
    }
}
