use std::env;
use std::time::Duration;

use crate::errors::ConfigError;

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";
pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "qwen2.5";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub trait ProviderConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>
    where
        Self: Sized;

    /// Helper function to get environment variables with error handling
    fn get_env(
        key: &str,
        required: bool,
        default: Option<String>,
    ) -> Result<Option<String>, ConfigError> {
        get_env(key, required, default)
    }
}

/// A blank value counts as unset
pub fn get_env(
    key: &str,
    required: bool,
    default: Option<String>,
) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() && required => {
            Err(ConfigError::Missing(key.to_string()))
        }
        Ok(value) if value.trim().is_empty() => Ok(default),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) if !required => Ok(default),
        Err(env::VarError::NotPresent) => Err(ConfigError::Missing(key.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// `1`, `true`, `yes` and `on` enable a flag, anything else disables it
pub fn get_env_flag(key: &str) -> Result<bool, ConfigError> {
    Ok(get_env(key, false, None)?
        .map(|v| parse_flag(&v))
        .unwrap_or(false))
}

pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn get_env_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match get_env(key, false, None)? {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    /// Ask for `response_format: json_object`
    pub force_json: bool,
    pub timeout: Duration,
}

impl OpenAiProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            model: OPENAI_MODEL.to_string(),
            force_json: false,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Everything but the credential comes from the environment. The key itself is
    /// resolved by provider selection, which falls back to Ollama when it is missing.
    pub fn from_env_with_key(api_key: String) -> Result<Self, ConfigError> {
        let host = get_env("OPENAI_HOST", false, Some(OPENAI_HOST.to_string()))?
            .unwrap_or_else(|| OPENAI_HOST.to_string());

        let model = get_env("OPENAI_MODEL", false, Some(OPENAI_MODEL.to_string()))?
            .unwrap_or_else(|| OPENAI_MODEL.to_string());

        Ok(Self {
            host,
            api_key,
            model,
            force_json: get_env_flag("MOO_FORCE_JSON")?,
            timeout: get_env_secs("MOO_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OllamaProviderConfig {
    pub host: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaProviderConfig {
    fn default() -> Self {
        Self {
            host: OLLAMA_HOST.to_string(),
            model: OLLAMA_MODEL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ProviderConfig for OllamaProviderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let host = Self::get_env("OLLAMA_HOST", false, Some(OLLAMA_HOST.to_string()))?
            .unwrap_or_else(|| OLLAMA_HOST.to_string());

        let model = Self::get_env("OLLAMA_MODEL", false, Some(OLLAMA_MODEL.to_string()))?
            .unwrap_or_else(|| OLLAMA_MODEL.to_string());

        Ok(Self {
            host,
            model,
            timeout: get_env_secs("MOO_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT)?,
        })
    }
}
