//! HTTP client for a local Ollama instance.
//!
//! Non-streaming: one request, one JSON body back. Model discovery goes
//! through `/api/tags`, completions through `/api/chat`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::engine::EngineClient;
use crate::error::EngineError;
use crate::task::types::ModelInfo;

/// Client for the Ollama HTTP API.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client against the given base URL
    /// (e.g. `http://127.0.0.1:11434`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn connection_error(&self, err: &reqwest::Error) -> EngineError {
        EngineError::Connection {
            url: self.base_url.clone(),
            reason: err.to_string(),
        }
    }

    /// The request/parse half of a chat call, without deadline or cancel
    /// handling.
    async fn chat_request(
        &self,
        model: &str,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, EngineError> {
        let body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": prompt},
            ],
            "stream": false,
        });

        let resp = self
            .client
            .post(self.api_url("/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.connection_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND && text.contains("not found") {
                return Err(EngineError::ModelNotFound {
                    model: model.to_string(),
                });
            }
            return Err(EngineError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let chat: ChatResponse = resp.json().await.map_err(|e| EngineError::InvalidResponse {
            reason: e.to_string(),
        })?;
        Ok(chat.message.content)
    }
}

#[async_trait]
impl EngineClient for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, EngineError> {
        let resp = self
            .client
            .get(self.api_url("/api/tags"))
            .send()
            .await
            .map_err(|e| self.connection_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let tags: TagsResponse = resp.json().await.map_err(|e| EngineError::InvalidResponse {
            reason: e.to_string(),
        })?;
        Ok(tags.models.into_iter().map(TagModel::into_info).collect())
    }

    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        prompt: &str,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> Result<String, EngineError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(EngineError::Cancelled),
            res = tokio::time::timeout(deadline, self.chat_request(model, system_prompt, prompt)) => {
                match res {
                    Ok(inner) => inner,
                    Err(_) => Err(EngineError::Timeout { timeout: deadline }),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    details: TagDetails,
}

#[derive(Debug, Default, Deserialize)]
struct TagDetails {
    #[serde(default)]
    parameter_size: String,
    #[serde(default)]
    quantization_level: String,
    #[serde(default)]
    family: String,
}

impl TagModel {
    fn into_info(self) -> ModelInfo {
        ModelInfo {
            name: self.name,
            size: self.size,
            parameter_size: self.details.parameter_size,
            quantization_level: self.details.quantization_level,
            family: self.details.family,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://127.0.0.1:11434/");
        assert_eq!(client.api_url("/api/tags"), "http://127.0.0.1:11434/api/tags");
    }

    #[test]
    fn tags_response_parses_into_model_info() {
        let body = r#"{
            "models": [
                {
                    "name": "qwen2.5-coder:14b",
                    "size": 8988124069,
                    "details": {
                        "parameter_size": "14.8B",
                        "quantization_level": "Q4_K_M",
                        "family": "qwen2"
                    }
                }
            ]
        }"#;
        let tags: TagsResponse = serde_json::from_str(body).unwrap();
        let info = tags
            .models
            .into_iter()
            .map(TagModel::into_info)
            .next()
            .unwrap();
        assert_eq!(info.name, "qwen2.5-coder:14b");
        assert_eq!(info.size, 8988124069);
        assert_eq!(info.parameter_size, "14.8B");
        assert_eq!(info.quantization_level, "Q4_K_M");
        assert_eq!(info.family, "qwen2");
    }

    #[test]
    fn tags_response_tolerates_missing_details() {
        let body = r#"{"models": [{"name": "tiny"}]}"#;
        let tags: TagsResponse = serde_json::from_str(body).unwrap();
        let info = tags
            .models
            .into_iter()
            .map(TagModel::into_info)
            .next()
            .unwrap();
        assert_eq!(info.name, "tiny");
        assert_eq!(info.size, 0);
        assert!(info.family.is_empty());
    }

    #[test]
    fn chat_response_parses_content() {
        let body = r#"{"message": {"role": "assistant", "content": "hello"}}"#;
        let chat: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(chat.message.content, "hello");
    }

    #[tokio::test]
    async fn chat_returns_cancelled_when_token_already_fired() {
        let client = OllamaClient::new("http://127.0.0.1:1");
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .chat("m", "s", "p", Duration::from_secs(5), token)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }
}
