use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::base::ModelInfo;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::content::ImageContent;
use crate::models::message::Message;
use crate::models::role::Role;

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub enum ImageFormat {
    OpenAi,
    Anthropic,
}

/// Convert an image content into an image json based on format
pub fn convert_image(image: &ImageContent, image_format: &ImageFormat) -> Value {
    match image_format {
        ImageFormat::OpenAi => json!({
            "type": "image_url",
            "image_url": {
                "url": image.data_url(),
                "detail": "high"
            }
        }),
        ImageFormat::Anthropic => json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": image.mime_type,
                "data": image.data,
            }
        }),
    }
}

/// Text plus image as a content-part array
fn multimodal_content(message: &Message, image: &ImageContent, image_format: &ImageFormat) -> Value {
    json!([
        {
            "type": "text",
            "text": message.content
        },
        convert_image(image, image_format)
    ])
}

/// Convert canonical messages to OpenAI's chat message specification.
///
/// The system message stays inline; messages with an image become content-part arrays.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match &message.image {
            None => json!({
                "role": message.role,
                "content": message.content
            }),
            Some(image) => json!({
                "role": message.role,
                "content": multimodal_content(message, image, &ImageFormat::OpenAi)
            }),
        })
        .collect()
}

/// Convert non-system canonical messages to Anthropic's message specification
pub fn messages_to_anthropic_spec(messages: &[&Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match &message.image {
            None => json!({
                "role": message.role,
                "content": message.content
            }),
            Some(image) => {
                let role = if message.role == Role::Assistant {
                    "assistant"
                } else {
                    "user"
                };
                json!({
                    "role": role,
                    "content": multimodal_content(message, image, &ImageFormat::Anthropic)
                })
            }
        })
        .collect()
}

/// Fail with the status and body when the vendor did not answer 2xx
pub async fn ensure_success(provider: &str, response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::upstream(provider, status.as_u16(), body))
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
}

/// Read a model listing that may sit under `data`, under `models`, or at the top level
pub fn parse_model_list(response: &Value) -> Vec<ModelInfo> {
    let entries = response
        .get("data")
        .and_then(|v| v.as_array())
        .or_else(|| response.get("models").and_then(|v| v.as_array()))
        .or_else(|| response.as_array());

    let Some(entries) = entries else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(id) if !id.is_empty() => Some(ModelInfo::new(id.clone(), id.clone())),
            Value::Object(_) => {
                let id = first_str(entry, &["id", "name", "model", "slug"])?;
                let name = first_str(entry, &["name", "id", "model", "slug"]).unwrap_or(id);
                Some(ModelInfo::new(id, name))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_to_openai_spec() {
        let messages = vec![
            Message::system().with_text("sys"),
            Message::user().with_text("Hello"),
        ];
        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 2);
        assert_eq!(spec[0], json!({"role": "system", "content": "sys"}));
        assert_eq!(spec[1], json!({"role": "user", "content": "Hello"}));
    }

    #[test]
    fn test_messages_to_openai_spec_with_image() {
        let messages = vec![Message::user()
            .with_text("copy")
            .with_image(ImageContent::new("abc", "image/png"))];
        let spec = messages_to_openai_spec(&messages);

        assert_eq!(
            spec[0],
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "copy"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,abc", "detail": "high"}}
                ]
            })
        );
    }

    #[test]
    fn test_messages_to_anthropic_spec_with_image() {
        let user = Message::user()
            .with_text("copy")
            .with_image(ImageContent::new("abc", "image/jpeg"));
        let plain = Message::assistant().with_text("ok");
        let spec = messages_to_anthropic_spec(&[&user, &plain]);

        assert_eq!(
            spec[0],
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "copy"},
                    {"type": "image", "source": {"type": "base64", "media_type": "image/jpeg", "data": "abc"}}
                ]
            })
        );
        assert_eq!(spec[1], json!({"role": "assistant", "content": "ok"}));
    }

    #[test]
    fn test_parse_model_list_shapes() {
        let openai = json!({"data": [{"id": "gpt-4o"}, {"id": "gpt-4o-mini", "name": "Mini"}]});
        assert_eq!(
            parse_model_list(&openai),
            vec![
                ModelInfo::new("gpt-4o", "gpt-4o"),
                ModelInfo::new("gpt-4o-mini", "Mini"),
            ]
        );

        let models_key = json!({"models": [{"model": "llama3"}, {"slug": "mistral"}]});
        assert_eq!(
            parse_model_list(&models_key),
            vec![
                ModelInfo::new("llama3", "llama3"),
                ModelInfo::new("mistral", "mistral"),
            ]
        );

        let bare = json!(["a", "", {"other": 1}]);
        assert_eq!(parse_model_list(&bare), vec![ModelInfo::new("a", "a")]);

        assert!(parse_model_list(&json!({"unexpected": true})).is_empty());
    }
}
