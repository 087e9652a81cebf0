use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, Usage};

type Reply = Box<dyn Fn() -> Result<Message, ProviderError> + Send + Sync>;

/// A mock provider that returns pre-configured responses for testing
#[derive(Clone)]
pub struct MockProvider {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    fallback: Arc<Mutex<Option<Reply>>>,
    snapshots: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        let provider = Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(None)),
            snapshots: Arc::new(Mutex::new(Vec::new())),
        };
        for response in responses {
            provider.push(move || Ok(response.clone()));
        }
        provider
    }

    pub fn push<F>(&self, reply: F)
    where
        F: Fn() -> Result<Message, ProviderError> + Send + Sync + 'static,
    {
        self.replies.lock().unwrap().push_back(Box::new(reply));
    }

    /// Answer with `reply` forever once the scripted responses run out
    pub fn repeat<F>(self, reply: F) -> Self
    where
        F: Fn() -> Result<Message, ProviderError> + Send + Sync + 'static,
    {
        *self.fallback.lock().unwrap() = Some(Box::new(reply));
        self
    }

    /// Every conversation the provider was sent, in call order
    pub fn snapshots(&self) -> Vec<Vec<Message>> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[Tool],
    ) -> Result<(Message, Usage), ProviderError> {
        self.snapshots.lock().unwrap().push(messages.to_vec());

        let scripted = self.replies.lock().unwrap().pop_front();
        let message = match scripted {
            Some(reply) => reply()?,
            None => match self.fallback.lock().unwrap().as_ref() {
                Some(reply) => reply()?,
                // Return empty response if no more pre-configured responses
                None => Message::assistant(),
            },
        };
        Ok((message, Usage::new(Some(1), Some(1), Some(2))))
    }
}
