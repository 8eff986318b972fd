//! OpenAI-compatible chat client on `rig`.

use std::time::Duration;

use async_trait::async_trait;
use csv_agent_core::{ChatMessage, Error, LlmClient, LlmResponse, Result};
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer token.
    pub api_key: String,
    /// API root, e.g. `http://localhost:11434/v1`.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Chat client backed by `rig::providers::openai`.
///
/// System messages become the agent preamble; the remaining messages are
/// sent as the prompt.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: openai::Client,
}

impl OpenAiClient {
    /// Build a client. Fails when the API key is empty.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::config("OpenAI API key is empty"));
        }
        let client: openai::Client = openai::Client::builder()
            .api_key(&config.api_key)
            .base_url(config.base_url.trim_end_matches('/'))
            .build()
            .map_err(|e| Error::config(format!("failed to build OpenAI client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let (preamble, prompt) = split_messages(messages);
        if prompt.is_empty() {
            return Err(Error::llm("conversation has no user message"));
        }

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let agent = self
            .client
            .agent(&self.config.model)
            .preamble(&preamble)
            .temperature(f64::from(self.config.temperature))
            .build();

        let content = tokio::time::timeout(self.config.timeout, agent.prompt(prompt.as_str()))
            .await
            .map_err(|_| {
                Error::llm(format!(
                    "request timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                tracing::warn!(error = %e, "Chat completion request failed");
                Error::llm(e.to_string())
            })?;

        Ok(LlmResponse::text(content))
    }
}

/// Join system messages into a preamble and everything else into the prompt.
fn split_messages(messages: &[ChatMessage]) -> (String, String) {
    let join = |system: bool| {
        messages
            .iter()
            .filter(|m| (m.role == "system") == system)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    (join(true), join(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_config_error() {
        let err = OpenAiClient::new(OpenAiConfig::new("  ")).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_builds_with_custom_endpoint() {
        let config = OpenAiConfig::new("sk-test")
            .with_base_url("http://localhost:11434/v1/")
            .with_model("llama3");

        let client = OpenAiClient::new(config).unwrap();

        assert_eq!(client.model(), "llama3");
    }

    #[test]
    fn test_split_messages() {
        let messages = vec![
            ChatMessage::system("dataset context"),
            ChatMessage::user("first"),
            ChatMessage::user("second"),
        ];

        let (preamble, prompt) = split_messages(&messages);

        assert_eq!(preamble, "dataset context");
        assert_eq!(prompt, "first\n\nsecond");
    }

    #[tokio::test]
    async fn test_chat_without_user_message_fails_early() {
        let client = OpenAiClient::new(OpenAiConfig::new("sk-test")).unwrap();
        let err = client.chat(&[ChatMessage::system("only context")]).await.unwrap_err();
        assert!(err.to_string().contains("no user message"));
    }
}
