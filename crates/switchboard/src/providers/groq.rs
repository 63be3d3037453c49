use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::base::{Provider, WireRequest, WireResponse};
use super::configs::{CallOptions, Config, ProviderDefaults};
use super::factory::ProviderType;
use super::http::HttpClient;
use super::utils::{
    openai_compatible_temperature, openai_payload, openai_response_to_message, post,
    resolve_config, ContentPolicy,
};
use crate::errors::ProviderResult;
use crate::key_manager::KeyStore;
use crate::models::message::Message;

pub const GROQ_HOST: &str = "https://api.groq.com";

/// Groq hosts have no multimodal tool support
pub const GROQ_CONTENT_POLICY: ContentPolicy = ContentPolicy::TextOnly;

pub struct GroqProvider {
    client: Arc<dyn HttpClient>,
    keys: Arc<dyn KeyStore>,
    host: String,
}

impl GroqProvider {
    pub fn new(client: Arc<dyn HttpClient>, keys: Arc<dyn KeyStore>, host: String) -> Self {
        Self { client, keys, host }
    }
}

#[async_trait]
impl Provider for GroqProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Groq
    }

    fn init(&self, model: &str, options: &CallOptions) -> ProviderResult<Config> {
        let config = resolve_config(
            self.provider_type(),
            self.keys.as_ref(),
            model,
            options,
            &ProviderDefaults::default(),
            &self.host,
        )?;
        let temperature = openai_compatible_temperature(config.temperature);
        Ok(config.with_temperature(temperature))
    }

    fn format_request(&self, config: &Config, messages: &[Message]) -> ProviderResult<WireRequest> {
        let url = format!("{}/openai/v1/chat/completions", config.host);
        let body = openai_payload(self.provider_type(), config, messages, GROQ_CONTENT_POLICY);
        debug!(provider = self.name(), url = %url, model = %body["model"], "formatted request");

        Ok(WireRequest {
            url,
            headers: vec![(
                "Authorization".to_string(),
                format!("Bearer {}", config.api_key),
            )],
            body,
        })
    }

    async fn call(&self, config: &Config, request: WireRequest) -> ProviderResult<WireResponse> {
        post(self.provider_type(), self.client.as_ref(), config, request).await
    }

    fn parse_response(&self, response: WireResponse) -> ProviderResult<Message> {
        openai_response_to_message(self.provider_type(), &response.body)
    }
}
