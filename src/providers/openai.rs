use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ProviderSettings;
use crate::error::ProviderError;
use crate::providers::{LLMProvider, ProviderOptions};

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[allow(dead_code)]
    prompt_tokens: usize,
    #[allow(dead_code)]
    completion_tokens: usize,
    total_tokens: usize,
}

/// OpenAI chat-completions provider implementation
pub struct OpenAIProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let api_key = settings.api_key.clone().context(
            "No OpenAI API key configured. Set OPENAI_API_KEY or api_key in the config file",
        )?;

        Ok(Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            client: Client::new(),
        })
    }

    /// Set custom base URL (for API-compatible services)
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn request_error(source: reqwest::Error) -> ProviderError {
        ProviderError::Request {
            provider: "openai".to_string(),
            source,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &ProviderOptions,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: options.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "openai".to_string(),
                message: format!("{}: {}", status, error_text),
            });
        }

        let body = response.text().await.map_err(Self::request_error)?;
        debug!("Raw OpenAI response: {}", body);

        let api_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse {
                provider: "openai".to_string(),
                source: e,
            })?;

        if let Some(usage) = &api_response.usage {
            debug!("OpenAI usage: {} tokens", usage.total_tokens);
        }

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Empty {
                provider: "openai".to_string(),
            })?;

        if let Some(reason) = &choice.finish_reason {
            if reason == "length" {
                warn!(
                    "OpenAI response was truncated at max_tokens ({}). Response may be incomplete.",
                    options.max_tokens
                );
            }
        }

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ProviderError::Empty {
                provider: "openai".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_chat_response() {
        let json = r#"{
            "choices": [{"message": {"content": "def add(a, b):\n    return a + b"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 20, "total_tokens": 32}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("def add(a, b):\n    return a + b")
        );
        assert_eq!(response.usage.unwrap().total_tokens, 32);
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let settings = ProviderSettings {
            api_key: None,
            ..ProviderSettings::default()
        };
        assert!(OpenAIProvider::new(&settings).is_err());
    }
}
