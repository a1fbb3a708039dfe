use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionClient, CompletionError, CompletionRequest, HistoryMessage};
use crate::config::Config;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [HistoryMessage],
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    /// Build a client from the API settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self, CompletionError> {
        Self::new(
            config.anthropic_base_url.clone(),
            config.anthropic_api_key.clone(),
            Duration::from_secs(config.completion_timeout_secs),
        )
    }

    /// Build a client for an explicit endpoint.
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .user_agent(concat!("pdf-chat/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|error| {
                CompletionError::ProviderUnavailable(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: &request.messages,
        };

        tracing::debug!(
            model = %request.model,
            history = request.messages.len(),
            system_chars = request.system.len(),
            "Sending completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                CompletionError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, message });
        }

        let body: MessagesResponse = response.json().await.map_err(|error| {
            CompletionError::InvalidResponse(format!("failed to decode response: {error}"))
        })?;

        let reply: String = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if reply.is_empty() {
            return Err(CompletionError::InvalidResponse(
                "response contained no text content".into(),
            ));
        }

        Ok(reply)
    }
}
