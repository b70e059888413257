use thiserror::Error;

/// Failures talking to an upstream LLM vendor
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} API error: {status} {body}")]
    UpstreamHttp {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse stream line: {0}")]
    UpstreamParse(#[from] serde_json::Error),

    #[error("Stream transport error: {0}")]
    StreamTransport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid conversation: {0}")]
    InvalidConversation(String),

    #[error("Unsupported provider type: {0}")]
    UnsupportedProvider(String),
}

impl ProviderError {
    pub fn upstream<P: Into<String>, B: Into<String>>(provider: P, status: u16, body: B) -> Self {
        ProviderError::UpstreamHttp {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures building the message list for a generation request
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Failed to render prompt: {0}")]
    Template(#[from] tera::Error),

    #[error("Failed to serialize existing elements: {0}")]
    Elements(#[from] serde_json::Error),
}
