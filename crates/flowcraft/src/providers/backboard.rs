//! Backboard speaks an assistant/thread/message protocol rather than a single chat call.
//!
//! Each completion creates a throwaway assistant carrying the system prompt, opens a
//! thread under it, posts the user content with streaming enabled, and deletes the
//! assistant afterwards whether or not the earlier steps succeeded.
use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::base::{IncrementSink, ModelInfo, Provider};
use super::configs::ProviderConfig;
use super::sse::{data_payload, decode_response, LineEvent, LineExtractor};
use super::utils::ensure_success;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::{split_system, Message};

const ASSISTANT_NAME: &str = "FlowCraft Session";
const DEFAULT_LLM_PROVIDER: &str = "openai";

pub struct BackboardProvider {
    client: Client,
    config: ProviderConfig,
}

/// Split `provider/model` into its parts; a bare model name uses the default provider
pub fn split_model(model: &str) -> (&str, &str) {
    match model.split_once('/') {
        Some((provider, name)) => (provider, name),
        None => (DEFAULT_LLM_PROVIDER, model),
    }
}

/// An assistant created for one request.
///
/// `release` deletes it and waits for the answer. If the guard is dropped without
/// being released (the request was cancelled mid-flight) the deletion is spawned
/// onto the runtime instead.
struct EphemeralAssistant {
    id: String,
    client: Client,
    url: String,
    api_key: String,
    released: bool,
}

impl EphemeralAssistant {
    async fn release(mut self) {
        delete_assistant(&self.client, &self.url, &self.api_key).await;
        self.released = true;
    }
}

impl Drop for EphemeralAssistant {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let client = self.client.clone();
        let url = std::mem::take(&mut self.url);
        let api_key = std::mem::take(&mut self.api_key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Assistant {} dropped before release, deleting in background", self.id);
                handle.spawn(async move {
                    delete_assistant(&client, &url, &api_key).await;
                });
            }
            Err(_) => {
                error!("Backboard assistant {} leaked: no runtime to delete it on", self.id)
            }
        }
    }
}

/// Best-effort deletion; failures are logged and never surfaced
async fn delete_assistant(client: &Client, url: &str, api_key: &str) {
    match client.delete(url).header("X-API-Key", api_key).send().await {
        Ok(response) if response.status().is_success() => {
            debug!("Deleted ephemeral assistant at {}", url);
        }
        Ok(response) => {
            error!(
                "Backboard cleanup returned {} for {} (non-fatal)",
                response.status(),
                url
            );
        }
        Err(e) => {
            error!("Backboard cleanup error (non-fatal): {}", e);
        }
    }
}

fn required_str(body: &Value, field: &str) -> ProviderResult<String> {
    body.get(field)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("missing `{}` in Backboard response", field)))
}

async fn open_assistant(
    client: Client,
    config: ProviderConfig,
    system_prompt: String,
) -> ProviderResult<EphemeralAssistant> {
    let response = client
        .post(config.endpoint("assistants"))
        .header("X-API-Key", &config.api_key)
        .json(&json!({
            "name": ASSISTANT_NAME,
            "system_prompt": system_prompt,
        }))
        .send()
        .await?;
    let response = ensure_success("Backboard create assistant", response).await?;
    let body: Value = response.json().await?;
    let id = required_str(&body, "assistant_id")?;

    Ok(EphemeralAssistant {
        url: config.endpoint(&format!("assistants/{}", id)),
        id,
        client,
        api_key: config.api_key,
        released: false,
    })
}

impl BackboardProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    /// Create the session assistant.
    ///
    /// The POST runs on its own task: if this request is cancelled while the vendor is
    /// still answering, the task finishes anyway and dropping its guard deletes the
    /// assistant that was created.
    async fn create_assistant(&self, system_prompt: &str) -> ProviderResult<EphemeralAssistant> {
        let client = self.client.clone();
        let config = self.config.clone();
        let system_prompt = system_prompt.to_string();
        tokio::spawn(open_assistant(client, config, system_prompt))
            .await
            .map_err(|e| {
                ProviderError::InvalidResponse(format!("assistant creation task failed: {}", e))
            })?
    }

    async fn create_thread(&self, assistant_id: &str) -> ProviderResult<String> {
        let response = self
            .client
            .post(self.config.endpoint(&format!("assistants/{}/threads", assistant_id)))
            .header("X-API-Key", &self.config.api_key)
            .json(&json!({}))
            .send()
            .await?;
        let response = ensure_success("Backboard create thread", response).await?;
        let body: Value = response.json().await?;
        required_str(&body, "thread_id")
    }

    async fn converse(
        &self,
        assistant_id: &str,
        content: String,
        on_increment: IncrementSink<'_>,
    ) -> ProviderResult<String> {
        let thread_id = self.create_thread(assistant_id).await?;
        let (llm_provider, model_name) = split_model(&self.config.model);

        let form = Form::new()
            .text("content", content)
            .text("stream", "true")
            .text("model_name", model_name.to_string())
            .text("llm_provider", llm_provider.to_string())
            .text("memory", "off");

        let response = self
            .client
            .post(self.config.endpoint(&format!("threads/{}/messages", thread_id)))
            .header("X-API-Key", &self.config.api_key)
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success("Backboard message", response).await?;

        decode_response(response, BackboardStreamParser, on_increment).await
    }
}

/// `data: {"type":"content_streaming","content":"..."}` lines, ended by a `message_complete` event
pub struct BackboardStreamParser;

impl LineExtractor for BackboardStreamParser {
    fn extract(&self, line: &str) -> ProviderResult<LineEvent> {
        let Some(data) = data_payload(line) else {
            return Ok(LineEvent::Ignore);
        };
        let json: Value = serde_json::from_str(data)?;
        Ok(match json["type"].as_str() {
            Some("content_streaming") => match json["content"].as_str() {
                Some(content) if !content.is_empty() => LineEvent::Increment(content.to_string()),
                _ => LineEvent::Ignore,
            },
            Some("message_complete") => LineEvent::Done,
            _ => LineEvent::Ignore,
        })
    }
}

#[async_trait]
impl Provider for BackboardProvider {
    async fn complete(
        &self,
        messages: &[Message],
        on_increment: IncrementSink<'_>,
    ) -> ProviderResult<String> {
        let (system, turns) = split_system(messages);
        let content = turns
            .iter()
            .map(|message| {
                if message.image.is_some() {
                    warn!("Backboard: image data in messages is not supported, sending text only");
                }
                message.content.as_str()
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let assistant = self.create_assistant(system.unwrap_or_default()).await?;
        let result = self.converse(&assistant.id, content, on_increment).await;
        assistant.release().await;
        result
    }

    async fn list_models(&self) -> ProviderResult<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.config.endpoint("models"))
            .query(&[("model_type", "llm")])
            .header("X-API-Key", &self.config.api_key)
            .send()
            .await?;
        let response = ensure_success("Backboard", response).await?;
        let body: Value = response.json().await?;

        let models = body["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|model| {
                        let provider = model["provider"].as_str()?;
                        let name = model["name"].as_str()?;
                        let id = format!("{}/{}", provider, name);
                        Some(ModelInfo::new(id.clone(), id))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    }
}
