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

pub const OPENAI_HOST: &str = "https://api.openai.com";

pub struct OpenAiProvider {
    client: Arc<dyn HttpClient>,
    keys: Arc<dyn KeyStore>,
    host: String,
}

impl OpenAiProvider {
    pub fn new(client: Arc<dyn HttpClient>, keys: Arc<dyn KeyStore>, host: String) -> Self {
        Self { client, keys, host }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAi
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
        let url = format!("{}/v1/chat/completions", config.host);
        let body = openai_payload(
            self.provider_type(),
            config,
            messages,
            ContentPolicy::Multimodal,
        );
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::key_manager::StaticKeyStore;
    use crate::models::tool::{ToolCall, ToolDefinition};
    use crate::providers::http::ReqwestClient;
    use crate::providers::mock::MockHttpClient;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn keys() -> Arc<dyn KeyStore> {
        Arc::new(StaticKeyStore::new().with_key(ProviderType::OpenAi, "test_api_key"))
    }

    async fn _setup_mock_server(response_body: Value) -> (MockServer, OpenAiProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test_api_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        // Create the OpenAiProvider with the mock server's URL as the host
        let provider = OpenAiProvider::new(Arc::new(ReqwestClient::new()), keys(), mock_server.uri());
        (mock_server, provider)
    }

    async fn complete(
        provider: &OpenAiProvider,
        messages: &[Message],
        options: CallOptions,
    ) -> ProviderResult<Message> {
        let config = provider.init("openai/gpt-4o", &options)?;
        let request = provider.format_request(&config, messages)?;
        let response = provider.call(&config, request).await?;
        provider.parse_response(response)
    }

    #[tokio::test]
    async fn test_complete_basic() -> anyhow::Result<()> {
        // Mock response for normal completion
        let response_body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello! How can I assist you today?",
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let (_, provider) = _setup_mock_server(response_body).await;
        let messages = vec![
            Message::system("You are a helpful assistant."),
            Message::user("Hello?"),
        ];

        let message = complete(&provider, &messages, CallOptions::new()).await?;
        assert_eq!(message, Message::assistant("Hello! How can I assist you today?"));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_tool_request() -> anyhow::Result<()> {
        // Mock response for tool calling
        let response_body = json!({
            "id": "chatcmpl-tool",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"location\":\"San Francisco, CA\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let (_, provider) = _setup_mock_server(response_body).await;
        let messages = vec![Message::user("What's the weather in San Francisco?")];

        let tool = ToolDefinition::new(
            "get_weather",
            "Gets the current weather for a location",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "The city and state, e.g. New York, NY"
                    }
                },
                "required": ["location"]
            }),
        );

        let message = complete(&provider, &messages, CallOptions::new().with_tools(vec![tool])).await?;

        assert_eq!(message.text(), "");
        assert_eq!(
            message.tool_calls(),
            &[ToolCall::new(
                "call_123",
                "get_weather",
                json!({"location": "San Francisco, CA"})
            )]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": {"message": "Incorrect API key provided"}})),
            )
            .mount(&mock_server)
            .await;

        let provider = OpenAiProvider::new(Arc::new(ReqwestClient::new()), keys(), mock_server.uri());
        let err = complete(&provider, &[Message::user("hi")], CallOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.provider, "openai");
    }

    #[test]
    fn test_init_applies_temperature_floor() {
        let provider = OpenAiProvider::new(Arc::new(MockHttpClient::new(vec![])), keys(), OPENAI_HOST.to_string());
        let config = provider.init("openai/gpt-4o", &CallOptions::new()).unwrap();
        assert_eq!(config.temperature, 1e-8);
        assert_eq!(config.api_key, "test_api_key");
    }

    #[test]
    fn test_init_without_key_is_configuration_error() {
        let provider = OpenAiProvider::new(
            Arc::new(MockHttpClient::new(vec![])),
            Arc::new(StaticKeyStore::new()),
            OPENAI_HOST.to_string(),
        );
        let err = provider.init("openai/gpt-4o", &CallOptions::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_format_request_round_trips_tool_ids() {
        let provider = OpenAiProvider::new(Arc::new(MockHttpClient::new(vec![])), keys(), OPENAI_HOST.to_string());
        let config = provider.init("openai/gpt-4o", &CallOptions::new()).unwrap();
        let messages = vec![
            Message::user("weather?"),
            Message::assistant("").with_tool_call(ToolCall::new(
                "call_abc",
                "get_weather",
                json!({"city": "Oslo"}),
            )),
            Message::tool("call_abc", "rain"),
        ];

        let request = provider.format_request(&config, &messages).unwrap();
        assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
        let wire = &request.body["messages"];
        assert_eq!(wire[1]["tool_calls"][0]["id"], "call_abc");
        assert_eq!(wire[2]["role"], "tool");
        assert_eq!(wire[2]["tool_call_id"], wire[1]["tool_calls"][0]["id"]);
        assert_eq!(request.body["temperature"], 1e-8);
    }
}
