use std::sync::Arc;

use strum_macros::{Display, EnumIter, EnumString};
use tracing::warn;

use super::base::Provider;
use super::configs::{get_env, OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig};
use super::observer::ExchangeObserver;
use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;
use crate::errors::{ConfigError, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn requires_credentials(&self) -> bool {
        matches!(self, ProviderKind::OpenAi)
    }
}

/// Fully resolved configuration of the provider used for a session
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSelection {
    OpenAi(OpenAiProviderConfig),
    Ollama(OllamaProviderConfig),
}

impl ProviderSelection {
    /// Resolve the requested provider against the environment.
    ///
    /// A provider that needs a credential which is absent is replaced by
    /// Ollama, with a warning, so the session never fails on its first call.
    pub fn from_env(kind: ProviderKind, api_key: Option<String>) -> Result<Self, ConfigError> {
        let api_key = match api_key {
            Some(key) if !key.trim().is_empty() => Some(key),
            _ => get_env("OPENAI_API_KEY", false, None)?,
        };

        match resolve_kind(kind, api_key.as_deref()) {
            ProviderKind::OpenAi => {
                let api_key = api_key.unwrap_or_default();
                Ok(ProviderSelection::OpenAi(
                    OpenAiProviderConfig::from_env_with_key(api_key)?,
                ))
            }
            ProviderKind::Ollama => Ok(ProviderSelection::Ollama(OllamaProviderConfig::from_env()?)),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderSelection::OpenAi(_) => ProviderKind::OpenAi,
            ProviderSelection::Ollama(_) => ProviderKind::Ollama,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderSelection::OpenAi(config) => &config.model,
            ProviderSelection::Ollama(config) => &config.model,
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        match &mut self {
            ProviderSelection::OpenAi(config) => config.model = model.into(),
            ProviderSelection::Ollama(config) => config.model = model.into(),
        }
        self
    }

    pub fn with_force_json(mut self, force_json: bool) -> Self {
        match &mut self {
            ProviderSelection::OpenAi(config) => config.force_json = force_json,
            ProviderSelection::Ollama(_) if force_json => {
                warn!("ollama rejects the response_format directive, ignoring force-json");
            }
            ProviderSelection::Ollama(_) => {}
        }
        self
    }
}

/// The provider actually used when `requested` is asked for with the given credential
pub fn resolve_kind(requested: ProviderKind, api_key: Option<&str>) -> ProviderKind {
    let has_key = api_key.map(|k| !k.trim().is_empty()).unwrap_or(false);
    if requested.requires_credentials() && !has_key {
        warn!(
            requested = %requested,
            fallback = %ProviderKind::Ollama,
            "no credentials for the requested provider, falling back"
        );
        return ProviderKind::Ollama;
    }
    requested
}

pub fn get_provider(
    selection: ProviderSelection,
    observer: Arc<dyn ExchangeObserver>,
) -> Result<Box<dyn Provider>, ProviderError> {
    match selection {
        ProviderSelection::OpenAi(config) => {
            Ok(Box::new(OpenAiProvider::new(config)?.with_observer(observer)))
        }
        ProviderSelection::Ollama(config) => {
            Ok(Box::new(OllamaProvider::new(config)?.with_observer(observer)))
        }
    }
}
