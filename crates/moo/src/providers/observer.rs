use serde_json::Value;
use tracing::debug;

/// Sees every request payload and raw response body a provider exchanges.
pub trait ExchangeObserver: Send + Sync {
    fn on_request(&self, provider: &str, url: &str, payload: &Value);
    fn on_response(&self, provider: &str, body: &Value);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExchangeObserver for NoopObserver {
    fn on_request(&self, _provider: &str, _url: &str, _payload: &Value) {}
    fn on_response(&self, _provider: &str, _body: &Value) {}
}

/// Dumps pretty-printed payloads at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ExchangeObserver for TracingObserver {
    fn on_request(&self, provider: &str, url: &str, payload: &Value) {
        debug!(
            provider,
            url,
            "request payload:\n{}",
            serde_json::to_string_pretty(payload).unwrap_or_default()
        );
    }

    fn on_response(&self, provider: &str, body: &Value) {
        debug!(
            provider,
            "response body:\n{}",
            serde_json::to_string_pretty(body).unwrap_or_default()
        );
    }
}
