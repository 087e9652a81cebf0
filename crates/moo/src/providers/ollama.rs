use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::base::{Provider, Usage};
use super::configs::OllamaProviderConfig;
use super::observer::{ExchangeObserver, NoopObserver};
use super::utils::{
    build_payload, check_response_error, ollama_response_to_message, ollama_usage, Dialect,
};
use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Talks to the native Ollama chat endpoint. No credentials are needed.
pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
    observer: Arc<dyn ExchangeObserver>,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExchangeObserver>) -> Self {
        self.observer = observer;
        self
    }

    async fn post(&self, payload: Value) -> Result<Value, ProviderError> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));
        self.observer.on_request(self.name(), &url, &payload);

        let response = self.client.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        self.observer.on_response(self.name(), &body);
        Ok(body)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage), ProviderError> {
        let payload = build_payload(&self.config.model, messages, tools, Dialect::Ollama)?;

        let response = self.post(payload).await?;
        check_response_error(&response)?;

        let message = ollama_response_to_message(&response)?;
        let usage = ollama_usage(&response);
        Ok((message, usage))
    }
}
