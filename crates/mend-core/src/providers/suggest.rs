//! AI suggestion provider.
//!
//! Two single round-trip operations with bounded token budgets: category
//! classification and fix-text generation. Every error is catchable and
//! attributable to the specific call site, so callers can degrade to
//! deterministic fallbacks per item.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::domain::{MendError, Result};

/// Trait for AI suggestion backends.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Request a one-of-taxonomy classification for a failure.
    async fn classify(&self, prompt: &str) -> Result<String>;

    /// Request replacement code for a classified failure.
    async fn suggest_fix(&self, prompt: &str) -> Result<String>;
}

/// Configuration for the OpenAI-compatible chat-completions client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Chat-completions endpoint URL.
    pub endpoint: String,

    /// API key. Empty means every call fails fast (and the caller's
    /// deterministic fallbacks take over).
    pub api_key: String,

    /// Model name.
    pub model: String,

    /// Per-response token budget.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.3,
            timeout_secs: 30,
        }
    }
}

impl OpenAiConfig {
    /// Create a config from environment variables.
    ///
    /// Reads `OPENAI_API_KEY`, `MEND_AI_ENDPOINT`, and `MEND_AI_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.api_key = key;
        }
        if let Ok(endpoint) = std::env::var("MEND_AI_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("MEND_AI_MODEL") {
            config.model = model;
        }
        config
    }
}

/// OpenAI-compatible suggestion client.
pub struct OpenAiSuggestions {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiSuggestions {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MendError::Suggestion(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env())
    }

    /// One bounded chat-completion round trip.
    async fn complete(&self, prompt: &str) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(MendError::Suggestion("no API key configured".to_string()));
        }

        let payload = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MendError::Suggestion(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MendError::Suggestion(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(MendError::Suggestion(format!(
                "provider returned HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| MendError::Suggestion(format!("malformed response: {e}")))?;

        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                MendError::Suggestion("response missing message content".to_string())
            })?;

        debug!(model = %self.config.model, chars = content.len(), "suggestion round trip complete");
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl SuggestionProvider for OpenAiSuggestions {
    async fn classify(&self, prompt: &str) -> Result<String> {
        self.complete(prompt).await
    }

    async fn suggest_fix(&self, prompt: &str) -> Result<String> {
        self.complete(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_config_default() {
        let config = OpenAiConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 500);
        assert!(config.api_key.is_empty());
    }

    #[tokio::test]
    async fn empty_api_key_fails_fast() {
        let client = OpenAiSuggestions::new(OpenAiConfig::default()).unwrap();
        let err = client.classify("prompt").await.unwrap_err();
        assert!(matches!(err, MendError::Suggestion(_)));
        assert!(err.to_string().contains("no API key"));
    }
}
