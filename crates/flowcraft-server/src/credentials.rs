//! Chooses which provider credentials a request runs with.
//!
//! A request presenting the access password runs with the server's credentials and
//! whatever it sent in `config` is never looked at. Without the password the caller
//! must bring a complete configuration of its own.
use axum::http::HeaderMap;
use flowcraft::providers::configs::{ProviderConfig, ProviderType};
use serde::Deserialize;

use crate::configuration::{AccessPolicy, ModelRequirement};
use crate::error::GatewayError;

pub const ACCESS_PASSWORD_HEADER: &str = "x-access-password";

/// Provider configuration as a client sends it; every field may be missing
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default, rename = "type")]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

fn missing() -> GatewayError {
    GatewayError::BadRequest("Missing required parameters".to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ClientConfig {
    fn into_provider_config(self, requirement: ModelRequirement) -> Result<ProviderConfig, GatewayError> {
        let raw_type = non_empty(self.provider_type).ok_or_else(missing)?;
        let provider_type: ProviderType = raw_type
            .parse()
            .map_err(|_| GatewayError::BadRequest(format!("Unsupported provider type: {}", raw_type)))?;
        let api_key = non_empty(self.api_key).ok_or_else(missing)?;
        let model = match requirement {
            ModelRequirement::Required => non_empty(self.model).ok_or_else(missing)?,
            ModelRequirement::Optional => non_empty(self.model).unwrap_or_default(),
        };
        let base_url = non_empty(self.base_url)
            .unwrap_or_else(|| provider_type.default_base_url().to_string());

        Ok(ProviderConfig::new(provider_type, base_url, api_key, model))
    }
}

/// Which credential source a request was resolved against, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Server,
    Client,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Server => "server",
            CredentialSource::Client => "client",
        }
    }
}

/// Resolve credentials for a generation request, which must name a model
pub fn resolve(
    policy: &AccessPolicy,
    headers: &HeaderMap,
    client: Option<ClientConfig>,
) -> Result<(ProviderConfig, CredentialSource), GatewayError> {
    resolve_with(policy, headers, client, ModelRequirement::Required)
}

/// Resolve credentials for model listing, where the model may still be unchosen
pub fn resolve_for_listing(
    policy: &AccessPolicy,
    headers: &HeaderMap,
    client: Option<ClientConfig>,
) -> Result<(ProviderConfig, CredentialSource), GatewayError> {
    resolve_with(policy, headers, client, ModelRequirement::Optional)
}

fn resolve_with(
    policy: &AccessPolicy,
    headers: &HeaderMap,
    client: Option<ClientConfig>,
    requirement: ModelRequirement,
) -> Result<(ProviderConfig, CredentialSource), GatewayError> {
    // An empty header is treated as not sent
    let password = headers
        .get(ACCESS_PASSWORD_HEADER)
        .filter(|value| !value.is_empty());
    if let Some(value) = password {
        let password = value
            .to_str()
            .map_err(|_| GatewayError::Unauthorized("Invalid access password".to_string()))?;
        policy.verify(password)?;
        return Ok((policy.server_config_with(requirement)?, CredentialSource::Server));
    }

    let config = client.ok_or_else(missing)?.into_provider_config(requirement)?;
    Ok((config, CredentialSource::Client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::LlmSettings;
    use axum::http::HeaderValue;

    fn policy() -> AccessPolicy {
        AccessPolicy::new(
            Some("pw".to_string()),
            LlmSettings {
                provider_type: Some("anthropic".to_string()),
                base_url: None,
                api_key: Some("server-key".to_string()),
                model: Some("claude-3-5-sonnet".to_string()),
            },
        )
    }

    fn client(api_key: Option<&str>) -> ClientConfig {
        ClientConfig {
            provider_type: Some("openai".to_string()),
            base_url: Some("https://attacker.example.com/v1".to_string()),
            api_key: api_key.map(String::from),
            model: Some("gpt-4".to_string()),
        }
    }

    fn with_password(pw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_PASSWORD_HEADER, HeaderValue::from_str(pw).unwrap());
        headers
    }

    #[test]
    fn test_password_ignores_client_config() {
        let (config, source) = resolve(&policy(), &with_password("pw"), Some(client(Some("client-key")))).unwrap();
        assert_eq!(source, CredentialSource::Server);
        assert_eq!(config.provider_type, ProviderType::Anthropic);
        assert_eq!(config.api_key, "server-key");
        assert_eq!(config.base_url, "https://api.anthropic.com/v1");
    }

    #[test]
    fn test_wrong_password() {
        let err = resolve(&policy(), &with_password("nope"), Some(client(Some("k")))).unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized(_)));
    }

    #[test]
    fn test_client_config() {
        let (config, source) = resolve(&policy(), &HeaderMap::new(), Some(client(Some("k")))).unwrap();
        assert_eq!(source, CredentialSource::Client);
        assert_eq!(config.api_key, "k");
        assert_eq!(config.base_url, "https://attacker.example.com/v1");
    }

    #[test]
    fn test_missing_client_fields() {
        let err = resolve(&policy(), &HeaderMap::new(), Some(client(None))).unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));

        let err = resolve(&policy(), &HeaderMap::new(), Some(client(Some("")))).unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));

        let err = resolve(&policy(), &HeaderMap::new(), None).unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));
    }

    #[test]
    fn test_empty_password_header_falls_back_to_client() {
        let (config, source) = resolve(&policy(), &with_password(""), Some(client(Some("k")))).unwrap();
        assert_eq!(source, CredentialSource::Client);
        assert_eq!(config.api_key, "k");

        let unset = AccessPolicy::default();
        let (_, source) = resolve(&unset, &with_password(""), Some(client(Some("k")))).unwrap();
        assert_eq!(source, CredentialSource::Client);
    }

    #[test]
    fn test_listing_does_not_need_a_model() {
        let err = resolve(&policy(), &HeaderMap::new(), Some(client_without_model())).unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));

        let (resolved, _) =
            resolve_for_listing(&policy(), &HeaderMap::new(), Some(client_without_model())).unwrap();
        assert_eq!(resolved.model, "");
        assert_eq!(resolved.api_key, "k");

        let err = resolve_for_listing(&policy(), &HeaderMap::new(), Some(client(None))).unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));
    }

    fn client_without_model() -> ClientConfig {
        ClientConfig {
            model: None,
            ..client(Some("k"))
        }
    }

    #[test]
    fn test_unknown_type() {
        let mut config = client(Some("k"));
        config.provider_type = Some("palm".to_string());
        let err = resolve(&policy(), &HeaderMap::new(), Some(config)).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported provider type: palm");
    }

    #[test]
    fn test_missing_base_url_uses_vendor_default() {
        let mut config = client(Some("k"));
        config.base_url = None;
        let (config, _) = resolve(&policy(), &HeaderMap::new(), Some(config)).unwrap();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }
}
