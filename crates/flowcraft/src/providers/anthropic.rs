use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::base::{IncrementSink, ModelInfo, Provider};
use super::configs::ProviderConfig;
use super::sse::{data_payload, decode_response, LineEvent, LineExtractor};
use super::utils::{ensure_success, messages_to_anthropic_spec, parse_model_list};
use crate::errors::ProviderResult;
use crate::models::message::{split_system, Message};

const PROVIDER_NAME: &str = "Anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;

pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    /// Anthropic takes the system prompt as a top-level field, not as a message
    fn build_payload(&self, messages: &[Message]) -> Value {
        let (system, turns) = split_system(messages);

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_anthropic_spec(&turns),
            "max_tokens": MAX_TOKENS,
            "stream": true,
            "temperature": 1
        });
        if let Some(system) = system {
            payload["system"] = json!([{ "type": "text", "text": system }]);
        }
        payload
    }
}

/// `data: {"type":"content_block_delta","delta":{"text":"..."}}` lines; other event types carry no text
pub struct AnthropicStreamParser;

impl LineExtractor for AnthropicStreamParser {
    fn extract(&self, line: &str) -> ProviderResult<LineEvent> {
        let Some(data) = data_payload(line) else {
            return Ok(LineEvent::Ignore);
        };
        let json: Value = serde_json::from_str(data)?;
        if json["type"] != "content_block_delta" {
            return Ok(LineEvent::Ignore);
        }
        Ok(match json["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => LineEvent::Increment(text.to_string()),
            _ => LineEvent::Ignore,
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[Message],
        on_increment: IncrementSink<'_>,
    ) -> ProviderResult<String> {
        let payload = self.build_payload(messages);

        let response = self
            .authorized(self.client.post(self.config.endpoint("messages")))
            .json(&payload)
            .send()
            .await?;
        let response = ensure_success(PROVIDER_NAME, response).await?;

        decode_response(response, AnthropicStreamParser, on_increment).await
    }

    async fn list_models(&self) -> ProviderResult<Vec<ModelInfo>> {
        let response = self
            .authorized(self.client.get(self.config.endpoint("models")))
            .send()
            .await?;
        let response = ensure_success(PROVIDER_NAME, response).await?;
        let body: Value = response.json().await?;
        Ok(parse_model_list(&body))
    }
}
