use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// The vendor families a request can be routed to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// OpenAI-compatible chat completions
    OpenAi,
    /// Anthropic messages
    Anthropic,
    /// Backboard assistant/thread/message sessions
    Backboard,
}

impl ProviderType {
    /// The vendor's public endpoint, used when a configuration leaves the base URL out
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderType::OpenAi => "https://api.openai.com/v1",
            ProviderType::Anthropic => "https://api.anthropic.com/v1",
            ProviderType::Backboard => "https://app.backboard.io/api",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Credentials and model for one upstream call. Never persisted.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl ProviderConfig {
    pub fn new<B, K, M>(provider_type: ProviderType, base_url: B, api_key: K, model: M) -> Self
    where
        B: Into<String>,
        K: Into<String>,
        M: Into<String>,
    {
        Self {
            provider_type,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Join a path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

// The api key stays out of logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_type", &self.provider_type)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}
