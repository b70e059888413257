use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::base::{IncrementSink, ModelInfo, Provider};
use super::configs::ProviderConfig;
use super::sse::{data_payload, decode_response, LineEvent, LineExtractor};
use super::utils::{ensure_success, messages_to_openai_spec, parse_model_list};
use crate::errors::ProviderResult;
use crate::models::message::Message;

const PROVIDER_NAME: &str = "OpenAI";

pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> ProviderResult<reqwest::Response> {
        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        ensure_success(PROVIDER_NAME, response).await
    }
}

/// `data: {"choices":[{"delta":{"content":"..."}}]}` lines, ended by `data: [DONE]`
pub struct OpenAiStreamParser;

impl LineExtractor for OpenAiStreamParser {
    fn extract(&self, line: &str) -> ProviderResult<LineEvent> {
        if line == "data: [DONE]" {
            return Ok(LineEvent::Done);
        }
        let Some(data) = data_payload(line) else {
            return Ok(LineEvent::Ignore);
        };
        let json: Value = serde_json::from_str(data)?;
        Ok(
            match json["choices"][0]["delta"]["content"].as_str() {
                Some(content) if !content.is_empty() => LineEvent::Increment(content.to_string()),
                _ => LineEvent::Ignore,
            },
        )
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        on_increment: IncrementSink<'_>,
    ) -> ProviderResult<String> {
        let payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages),
            "stream": true
        });

        let response = self.post(payload).await?;
        decode_response(response, OpenAiStreamParser, on_increment).await
    }

    async fn list_models(&self) -> ProviderResult<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.config.endpoint("models"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send()
            .await?;
        let response = ensure_success(PROVIDER_NAME, response).await?;
        let body: Value = response.json().await?;
        Ok(parse_model_list(&body))
    }
}
