use async_trait::async_trait;
use serde_json::Value;

use super::configs::{CallOptions, Config};
use super::factory::ProviderType;
use super::http::HttpResponse;
use crate::errors::ProviderResult;
use crate::models::message::Message;

/// A fully-built vendor request, ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

pub type WireResponse = HttpResponse;

/// Base trait for AI providers (OpenAI, Anthropic, etc)
///
/// A call runs `init`, then `format_request`, then `call`, then
/// `parse_response`. Only `call` performs I/O.
#[async_trait]
pub trait Provider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    fn name(&self) -> &'static str {
        self.provider_type().name()
    }

    /// Resolve per-call options into a config, including the credential
    fn init(&self, model: &str, options: &CallOptions) -> ProviderResult<Config>;

    /// Translate canonical messages into the vendor request; never performs I/O
    fn format_request(&self, config: &Config, messages: &[Message]) -> ProviderResult<WireRequest>;

    /// Send the request and map non-success statuses to errors
    async fn call(&self, config: &Config, request: WireRequest) -> ProviderResult<WireResponse>;

    /// Translate the vendor response back into a canonical assistant message
    fn parse_response(&self, response: WireResponse) -> ProviderResult<Message>;
}
