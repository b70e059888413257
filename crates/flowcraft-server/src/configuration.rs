use crate::error::{to_env_var, ConfigError, GatewayError};
use config::{Config, Environment};
use flowcraft::providers::configs::{ProviderConfig, ProviderType};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Whether a resolved provider config has to name a model.
///
/// Generation does; listing models does not, since the list is how a model gets picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRequirement {
    Required,
    Optional,
}

/// Server-enforced provider credentials. Every field is optional at startup;
/// completeness is checked when a password-authenticated request needs them.
#[derive(Clone, Default, Deserialize)]
pub struct LlmSettings {
    #[serde(default, rename = "type")]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider_type", &self.provider_type)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl LlmSettings {
    fn required(&self, value: &Option<String>, key: &str) -> Result<String, GatewayError> {
        present(value).map(String::from).ok_or_else(|| {
            GatewayError::ServerMisconfigured(format!(
                "Server LLM configuration incomplete: {} is not set",
                to_env_var(key)
            ))
        })
    }

    pub fn is_configured(&self) -> bool {
        present(&self.provider_type).is_some()
            && present(&self.api_key).is_some()
            && present(&self.model).is_some()
    }

    /// Build the provider config, falling back to the vendor endpoint when no base URL is set
    pub fn provider_config_with(
        &self,
        requirement: ModelRequirement,
    ) -> Result<ProviderConfig, GatewayError> {
        let raw_type = self.required(&self.provider_type, "llm.type")?;
        let provider_type: ProviderType = raw_type.parse().map_err(|_| {
            GatewayError::ServerMisconfigured(format!(
                "Server LLM configuration invalid: unsupported provider type {}",
                raw_type
            ))
        })?;
        let api_key = self.required(&self.api_key, "llm.api_key")?;
        let model = match requirement {
            ModelRequirement::Required => self.required(&self.model, "llm.model")?,
            ModelRequirement::Optional => present(&self.model).unwrap_or_default().to_string(),
        };
        let base_url = present(&self.base_url)
            .unwrap_or_else(|| provider_type.default_base_url())
            .to_string();

        Ok(ProviderConfig::new(provider_type, base_url, api_key, model))
    }
}

/// The read-once trust settings handed to every request
#[derive(Clone, Default)]
pub struct AccessPolicy {
    access_password: Option<String>,
    server_llm: LlmSettings,
}

impl fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPolicy")
            .field("has_password", &self.has_password())
            .field("server_llm", &self.server_llm)
            .finish()
    }
}

impl AccessPolicy {
    pub fn new(access_password: Option<String>, server_llm: LlmSettings) -> Self {
        Self {
            access_password: access_password.filter(|p| !p.is_empty()),
            server_llm,
        }
    }

    pub fn has_password(&self) -> bool {
        self.access_password.is_some()
    }

    pub fn has_server_llm(&self) -> bool {
        self.server_llm.is_configured()
    }

    /// Check a candidate password against the configured one
    pub fn verify(&self, candidate: &str) -> Result<(), GatewayError> {
        match &self.access_password {
            None => Err(GatewayError::BadRequest(
                "Access password not configured on server".to_string(),
            )),
            Some(expected) if expected == candidate => Ok(()),
            Some(_) => Err(GatewayError::Unauthorized(
                "Invalid access password".to_string(),
            )),
        }
    }

    pub fn server_config_with(
        &self,
        requirement: ModelRequirement,
    ) -> Result<ProviderConfig, GatewayError> {
        self.server_llm.provider_config_with(requirement)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub access_password: Option<String>,
    #[serde(default)]
    pub llm: LlmSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?;

        // The bare ACCESS_PASSWORD is honoured below FLOWCRAFT_ACCESS_PASSWORD
        if let Ok(password) = env::var(LEGACY_PASSWORD_VAR) {
            builder = builder.set_default("access_password", password)?;
        }

        let config = builder
            .add_source(
                Environment::with_prefix("FLOWCRAFT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.access_password.clone(), self.llm.clone())
    }
}

const LEGACY_PASSWORD_VAR: &str = "ACCESS_PASSWORD";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("FLOWCRAFT_") {
                env::remove_var(&key);
            }
        }
        env::remove_var(LEGACY_PASSWORD_VAR);
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.access_password, None);

        let policy = settings.access_policy();
        assert!(!policy.has_password());
        assert!(!policy.has_server_llm());
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("FLOWCRAFT_SERVER__PORT", "8080");
        env::set_var("FLOWCRAFT_ACCESS_PASSWORD", "hunter2");
        env::set_var("FLOWCRAFT_LLM__TYPE", "anthropic");
        env::set_var("FLOWCRAFT_LLM__API_KEY", "sk-ant");
        env::set_var("FLOWCRAFT_LLM__MODEL", "claude-3-5-sonnet");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);

        let policy = settings.access_policy();
        assert!(policy.verify("hunter2").is_ok());
        let config = policy.server_config_with(ModelRequirement::Required).unwrap();
        assert_eq!(config.provider_type, ProviderType::Anthropic);
        assert_eq!(config.base_url, "https://api.anthropic.com/v1");
        assert_eq!(config.api_key, "sk-ant");
        assert_eq!(config.model, "claude-3-5-sonnet");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_bare_access_password() {
        clean_env();
        env::set_var("ACCESS_PASSWORD", "legacy");

        let policy = Settings::new().unwrap().access_policy();
        assert!(policy.verify("legacy").is_ok());

        env::set_var("FLOWCRAFT_ACCESS_PASSWORD", "prefixed");
        let policy = Settings::new().unwrap().access_policy();
        assert!(policy.verify("prefixed").is_ok());
        assert!(policy.verify("legacy").is_err());

        clean_env();
    }

    #[test]
    #[serial]
    fn test_server_llm_base_url_override() {
        clean_env();
        env::set_var("FLOWCRAFT_LLM__TYPE", "openai");
        env::set_var("FLOWCRAFT_LLM__BASE_URL", "https://proxy.example.com/v1");
        env::set_var("FLOWCRAFT_LLM__API_KEY", "sk-test");
        env::set_var("FLOWCRAFT_LLM__MODEL", "gpt-4o");

        let config = Settings::new()
            .unwrap()
            .access_policy()
            .server_config_with(ModelRequirement::Required)
            .unwrap();
        assert_eq!(config.base_url, "https://proxy.example.com/v1");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_other_error() {
        clean_env();
        env::set_var("FLOWCRAFT_SERVER__PORT", "not-a-port");

        let err = Settings::new().unwrap_err();
        assert!(matches!(err, ConfigError::Other(_)));

        clean_env();
    }

    #[test]
    fn test_incomplete_server_llm_names_variable() {
        let policy = AccessPolicy::new(
            Some("pw".to_string()),
            LlmSettings {
                provider_type: Some("openai".to_string()),
                model: Some("gpt-4o".to_string()),
                ..Default::default()
            },
        );
        let err = policy.server_config_with(ModelRequirement::Required).unwrap_err();
        assert!(matches!(err, GatewayError::ServerMisconfigured(_)));
        assert!(err.to_string().contains("FLOWCRAFT_LLM__API_KEY"));
    }

    #[test]
    fn test_server_llm_without_model_can_list() {
        let policy = AccessPolicy::new(
            Some("pw".to_string()),
            LlmSettings {
                provider_type: Some("openai".to_string()),
                api_key: Some("k".to_string()),
                ..Default::default()
            },
        );
        assert!(policy.server_config_with(ModelRequirement::Required).is_err());
        let config = policy.server_config_with(ModelRequirement::Optional).unwrap();
        assert_eq!(config.model, "");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_unknown_server_type_is_misconfigured() {
        let policy = AccessPolicy::new(
            None,
            LlmSettings {
                provider_type: Some("mystery".to_string()),
                api_key: Some("k".to_string()),
                model: Some("m".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(
            policy.server_config_with(ModelRequirement::Required),
            Err(GatewayError::ServerMisconfigured(_))
        ));
    }

    #[test]
    fn test_verify() {
        let unset = AccessPolicy::new(Some(String::new()), LlmSettings::default());
        assert!(matches!(unset.verify("x"), Err(GatewayError::BadRequest(_))));

        let policy = AccessPolicy::new(Some("pw".to_string()), LlmSettings::default());
        assert!(policy.verify("pw").is_ok());
        assert!(matches!(policy.verify("nope"), Err(GatewayError::Unauthorized(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let policy = AccessPolicy::new(
            Some("pw-secret".to_string()),
            LlmSettings {
                api_key: Some("sk-secret".to_string()),
                ..Default::default()
            },
        );
        let rendered = format!("{:?}", policy);
        assert!(!rendered.contains("pw-secret"));
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }
}
