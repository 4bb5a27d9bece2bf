//! Reasoning service HTTP client (OpenAI-compatible chat completions)
//!
//! Sends one system and one user message and returns the completion text.
//! Parsing the text into a reasoning draft is the gateway's job.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::error::{GovernanceError, Result};
use crate::gateway::prompts::PromptPair;

/// Connection settings for the reasoning service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningClientConfig {
    /// Base URL; `/chat/completions` is appended
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ReasoningClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.1,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
}

/// Authenticated client for the reasoning service
pub struct ReasoningClient {
    client: Client,
    config: ReasoningClientConfig,
    api_key: SecretString,
}

impl ReasoningClient {
    pub fn new(config: ReasoningClientConfig, api_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GovernanceError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &ReasoningClientConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    /// Request a completion and return the text of the first choice
    pub async fn complete(&self, prompts: &PromptPair) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": prompts.system },
                { "role": "user", "content": prompts.user },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "response_format": { "type": "json_object" },
        });

        tracing::debug!(model = %self.config.model, "Sending reasoning request");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GovernanceError::unavailable(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GovernanceError::unavailable(format!(
                "reasoning service returned {}: {}",
                status,
                truncate(&error_text, 512)
            )));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| GovernanceError::unavailable(format!("failed to read response body: {}", e.without_url())))?;
        let completion: ChatCompletion = serde_json::from_str(&raw)
            .map_err(|e| GovernanceError::malformed(format!("completion envelope: {}", e)))?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                "Reasoning usage"
            );
        }

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GovernanceError::malformed("completion contained no choices"))?;
        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("Reasoning completion was truncated at max_tokens");
        }
        choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GovernanceError::malformed("completion contained no content"))
    }
}

impl std::fmt::Debug for ReasoningClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningClient")
            .field("config", &self.config)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
