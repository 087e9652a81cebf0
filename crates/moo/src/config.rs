//! Session-wide settings read from the environment.
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::providers::configs::{get_env, get_env_flag, get_env_secs};
use crate::providers::factory::{ProviderKind, ProviderSelection};
use crate::providers::observer::{ExchangeObserver, NoopObserver, TracingObserver};
use crate::tools::cowsay::{Cowsay, COWSAY_BIN, DEFAULT_TOOL_TIMEOUT};

pub const SYSTEM_PROMPT: &str = "You are an AI assistant with tool support";

#[derive(Debug, Clone, PartialEq)]
pub struct MooConfig {
    pub provider: ProviderKind,
    /// Replaces the selected provider's default model
    pub model: Option<String>,
    pub debug: bool,
    pub force_json: bool,
    pub tool_timeout: Duration,
    pub cowsay_bin: String,
}

impl Default for MooConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: None,
            debug: false,
            force_json: false,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            cowsay_bin: COWSAY_BIN.to_string(),
        }
    }
}

impl MooConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match get_env("MOO_PROVIDER", false, None)? {
            Some(value) => parse_provider(&value)?,
            None => ProviderKind::OpenAi,
        };

        Ok(Self {
            provider,
            model: get_env("MOO_MODEL", false, None)?,
            debug: get_env_flag("MOO_DEBUG")?,
            force_json: get_env_flag("MOO_FORCE_JSON")?,
            tool_timeout: get_env_secs("MOO_TOOL_TIMEOUT_SECS", DEFAULT_TOOL_TIMEOUT)?,
            cowsay_bin: get_env("COWSAY_BIN", false, Some(COWSAY_BIN.to_string()))?
                .unwrap_or_else(|| COWSAY_BIN.to_string()),
        })
    }

    /// Resolve the provider, applying the model and force-json overrides
    pub fn provider_selection(
        &self,
        api_key: Option<String>,
    ) -> Result<ProviderSelection, ConfigError> {
        let mut selection =
            ProviderSelection::from_env(self.provider, api_key)?.with_force_json(self.force_json);
        if let Some(model) = &self.model {
            selection = selection.with_model(model.clone());
        }
        Ok(selection)
    }

    pub fn cowsay(&self) -> Cowsay {
        Cowsay::new(self.cowsay_bin.clone()).with_timeout(self.tool_timeout)
    }

    pub fn observer(&self) -> Arc<dyn ExchangeObserver> {
        if self.debug {
            Arc::new(TracingObserver)
        } else {
            Arc::new(NoopObserver)
        }
    }
}

pub fn parse_provider(value: &str) -> Result<ProviderKind, ConfigError> {
    ProviderKind::from_str(value.trim()).map_err(|_| ConfigError::Invalid {
        key: "MOO_PROVIDER".to_string(),
        value: value.to_string(),
    })
}
