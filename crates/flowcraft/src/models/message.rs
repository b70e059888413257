use super::content::ImageContent;
use super::role::Role;
use crate::errors::ProviderError;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// A vendor-agnostic message to or from an LLM
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageContent>,
}

impl Message {
    fn new(role: Role) -> Self {
        Message {
            role,
            content: String::new(),
            image: None,
        }
    }

    /// Create a new system message
    pub fn system() -> Self {
        Self::new(Role::System)
    }

    /// Create a new user message
    pub fn user() -> Self {
        Self::new(Role::User)
    }

    /// Create a new assistant message
    pub fn assistant() -> Self {
        Self::new(Role::Assistant)
    }

    /// Set the text of the message
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.content = text.into();
        self
    }

    /// Attach an inline image to the message
    pub fn with_image(mut self, image: ImageContent) -> Self {
        self.image = Some(image);
        self
    }
}

/// Split a conversation into its leading system prompt and the remaining turns
pub fn split_system(messages: &[Message]) -> (Option<&str>, Vec<&Message>) {
    let system = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str());
    let rest = messages.iter().filter(|m| m.role != Role::System).collect();
    (system, rest)
}

/// Check that a conversation can be handed to a provider.
///
/// A system message, if present, must be first and unique, and the last message
/// must come from the user.
pub fn validate_conversation(messages: &[Message]) -> Result<(), ProviderError> {
    let system_count = messages.iter().filter(|m| m.role == Role::System).count();
    if system_count > 1 {
        return Err(ProviderError::InvalidConversation(
            "more than one system message".to_string(),
        ));
    }
    if system_count == 1 && messages[0].role != Role::System {
        return Err(ProviderError::InvalidConversation(
            "system message must come first".to_string(),
        ));
    }
    match messages.last() {
        Some(last) if last.role == Role::User => Ok(()),
        _ => Err(ProviderError::InvalidConversation(
            "conversation must end with a user message".to_string(),
        )),
    }
}
