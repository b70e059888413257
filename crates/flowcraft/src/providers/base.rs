use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderResult;
use crate::models::message::Message;

/// Callback receiving each text increment, in arrival order
pub type IncrementSink<'a> = &'a mut (dyn FnMut(&str) + Send);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

impl ModelInfo {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Result of probing a configuration by listing its models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelInfo>,
}

/// Base trait for LLM vendors (OpenAI, Anthropic, Backboard)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stream a completion for the conversation.
    ///
    /// Every increment is handed to `on_increment` before the next line of the
    /// upstream body is decoded; the concatenation of all increments is returned.
    async fn complete(
        &self,
        messages: &[Message],
        on_increment: IncrementSink<'_>,
    ) -> ProviderResult<String>;

    /// List the models the configured credentials can use
    async fn list_models(&self) -> ProviderResult<Vec<ModelInfo>>;
}

/// Probe a provider by listing its models. Never fails; failures are reported.
pub async fn test_connection(provider: &dyn Provider) -> ConnectionReport {
    match provider.list_models().await {
        Ok(models) if !models.is_empty() => ConnectionReport {
            success: true,
            message: format!(
                "Connection successful, found {} available models",
                models.len()
            ),
            models: models.into_iter().take(5).collect(),
        },
        Ok(_) => ConnectionReport {
            success: false,
            message: "Connection successful but no available models found".to_string(),
            models: Vec::new(),
        },
        Err(e) => ConnectionReport {
            success: false,
            message: format!("Connection failed: {}", e),
            models: Vec::new(),
        },
    }
}
