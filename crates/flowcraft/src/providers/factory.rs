use super::{
    anthropic::AnthropicProvider,
    backboard::BackboardProvider,
    base::{self, ConnectionReport, IncrementSink, Provider},
    configs::{ProviderConfig, ProviderType},
    openai::OpenAiProvider,
};
use crate::errors::ProviderResult;
use crate::models::message::{validate_conversation, Message};

pub fn get_provider(config: ProviderConfig) -> ProviderResult<Box<dyn Provider>> {
    match config.provider_type {
        ProviderType::OpenAi => Ok(Box::new(OpenAiProvider::new(config)?)),
        ProviderType::Anthropic => Ok(Box::new(AnthropicProvider::new(config)?)),
        ProviderType::Backboard => Ok(Box::new(BackboardProvider::new(config)?)),
    }
}

/// Validate the conversation, then stream it through the vendor named by `config`
pub async fn send(
    config: ProviderConfig,
    messages: &[Message],
    on_increment: IncrementSink<'_>,
) -> ProviderResult<String> {
    validate_conversation(messages)?;
    let provider = get_provider(config)?;
    provider.complete(messages, on_increment).await
}

/// Probe `config` by listing its models; construction failures are reported like any other
pub async fn test_connection(config: ProviderConfig) -> ConnectionReport {
    match get_provider(config) {
        Ok(provider) => base::test_connection(provider.as_ref()).await,
        Err(e) => ConnectionReport {
            success: false,
            message: format!("Connection failed: {}", e),
            models: Vec::new(),
        },
    }
}
