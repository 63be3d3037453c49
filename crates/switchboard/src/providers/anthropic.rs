use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::base::{Provider, WireRequest, WireResponse};
use super::configs::{CallOptions, Config, ProviderDefaults};
use super::factory::ProviderType;
use super::http::HttpClient;
use super::utils::{error_message, post, resolve_config, split_system, strip_provider_prefix};
use crate::errors::{Error, ProviderResult};
use crate::key_manager::KeyStore;
use crate::models::content::{Content, ContentItem};
use crate::models::message::Message;
use crate::models::tool::{ToolCall, ToolDefinition};

pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    client: Arc<dyn HttpClient>,
    keys: Arc<dyn KeyStore>,
    host: String,
}

fn with_cache_control(mut block: Value, cache: bool) -> Value {
    if cache {
        block["cache_control"] = json!({"type": "ephemeral"});
    }
    block
}

fn content_block(item: &ContentItem) -> Value {
    match item {
        ContentItem::Text { text, cache } => {
            with_cache_control(json!({"type": "text", "text": text}), *cache)
        }
        ContentItem::Image {
            mime_type,
            data,
            cache,
        } => with_cache_control(
            json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": mime_type,
                    "data": data,
                }
            }),
            *cache,
        ),
    }
}

/// A plain string stays a string; item lists become typed blocks
fn anthropic_content(content: &Content) -> Value {
    match content {
        Content::Text(text) => json!(text),
        Content::Items(items) => Value::Array(items.iter().map(content_block).collect()),
    }
}

fn is_tool_result_turn(message: &Value) -> bool {
    message["role"] == "user"
        && message["content"]
            .as_array()
            .is_some_and(|blocks| {
                !blocks.is_empty() && blocks.iter().all(|b| b["type"] == "tool_result")
            })
}

impl AnthropicProvider {
    pub fn new(client: Arc<dyn HttpClient>, keys: Arc<dyn KeyStore>, host: String) -> Self {
        Self { client, keys, host }
    }

    fn messages_to_anthropic_spec(turns: &[&Message]) -> Vec<Value> {
        let mut anthropic_messages: Vec<Value> = Vec::new();

        for message in turns {
            match message {
                Message::User { content } => anthropic_messages.push(json!({
                    "role": "user",
                    "content": anthropic_content(content),
                })),
                Message::Assistant {
                    content,
                    tool_calls,
                } if tool_calls.is_empty() => anthropic_messages.push(json!({
                    "role": "assistant",
                    "content": anthropic_content(content),
                })),
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut blocks: Vec<Value> = content
                        .to_items()
                        .iter()
                        .filter(|item| item.as_text().map_or(true, |text| !text.is_empty()))
                        .map(content_block)
                        .collect();
                    blocks.extend(tool_calls.iter().map(|call| {
                        json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.name,
                            "input": call.arguments,
                        })
                    }));
                    anthropic_messages.push(json!({"role": "assistant", "content": blocks}));
                }
                Message::Tool {
                    content,
                    tool_call_id,
                } => {
                    let block = json!({
                        "type": "tool_result",
                        "tool_use_id": tool_call_id,
                        "content": anthropic_content(content),
                    });
                    // Results for parallel tool calls share one user turn
                    let previous = anthropic_messages
                        .last_mut()
                        .filter(|last| is_tool_result_turn(last))
                        .and_then(|last| last["content"].as_array_mut());
                    match previous {
                        Some(blocks) => blocks.push(block),
                        None => anthropic_messages.push(json!({"role": "user", "content": [block]})),
                    }
                }
                Message::System { .. } => {}
            }
        }

        anthropic_messages
    }

    /// A string when nothing is cached, otherwise text blocks carrying cache markers
    fn system_to_anthropic_spec(system: &[ContentItem]) -> Option<Value> {
        let texts: Vec<&ContentItem> = system.iter().filter(|item| !item.is_image()).collect();
        if texts.is_empty() {
            return None;
        }
        if texts.iter().any(|item| item.cache()) {
            Some(Value::Array(texts.into_iter().map(content_block).collect()))
        } else {
            Some(json!(texts
                .iter()
                .filter_map(|item| item.as_text())
                .collect::<Vec<_>>()
                .join("\n\n")))
        }
    }

    fn tools_to_anthropic_spec(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                let mut spec = json!({
                    "name": tool.name,
                    "input_schema": tool.parameters_or_empty(),
                });
                if let Some(description) = &tool.description {
                    spec["description"] = json!(description);
                }
                spec
            })
            .collect()
    }

    /// Convert a Messages API response into a canonical message
    pub fn response_to_message(response: &Value) -> ProviderResult<Message> {
        if response["type"] == "error" {
            return Err(Error::provider(
                ProviderType::Anthropic.name(),
                format!("Anthropic API error: {}", error_message(response)),
            ));
        }

        let blocks = response
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::provider(
                    ProviderType::Anthropic.name(),
                    "Invalid response format from Anthropic API",
                )
            })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in blocks {
            match block["type"].as_str() {
                Some("text") => text.push_str(block["text"].as_str().unwrap_or_default()),
                Some("tool_use") => tool_calls.push(ToolCall::new(
                    block["id"].as_str().unwrap_or_default(),
                    block["name"].as_str().unwrap_or_default(),
                    match &block["input"] {
                        Value::Null => json!({}),
                        input => input.clone(),
                    },
                )),
                _ => {}
            }
        }

        Ok(Message::Assistant {
            content: Content::Text(text),
            tool_calls,
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn init(&self, model: &str, options: &CallOptions) -> ProviderResult<Config> {
        let defaults = ProviderDefaults {
            max_tokens: Some(ANTHROPIC_MAX_TOKENS),
        };
        resolve_config(
            self.provider_type(),
            self.keys.as_ref(),
            model,
            options,
            &defaults,
            &self.host,
        )
    }

    fn format_request(&self, config: &Config, messages: &[Message]) -> ProviderResult<WireRequest> {
        let model = strip_provider_prefix(&config.model, self.provider_type());
        let split = split_system(messages);

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(model));
        payload.insert(
            "messages".to_string(),
            Value::Array(Self::messages_to_anthropic_spec(&split.turns)),
        );
        payload.insert(
            "max_tokens".to_string(),
            json!(config.max_tokens.unwrap_or(ANTHROPIC_MAX_TOKENS)),
        );
        if let Some(system) = Self::system_to_anthropic_spec(&split.system) {
            payload.insert("system".to_string(), system);
        }
        payload.insert("temperature".to_string(), json!(config.temperature));
        if let Some(top_p) = config.top_p {
            payload.insert("top_p".to_string(), json!(top_p));
        }
        if !config.tools.is_empty() {
            payload.insert(
                "tools".to_string(),
                Value::Array(Self::tools_to_anthropic_spec(&config.tools)),
            );
        }

        let url = format!("{}/v1/messages", config.host);
        debug!(provider = self.name(), url = %url, model, "formatted request");

        Ok(WireRequest {
            url,
            headers: vec![
                ("x-api-key".to_string(), config.api_key.clone()),
                (
                    "anthropic-version".to_string(),
                    ANTHROPIC_VERSION.to_string(),
                ),
            ],
            body: Value::Object(payload),
        })
    }

    async fn call(&self, config: &Config, request: WireRequest) -> ProviderResult<WireResponse> {
        post(self.provider_type(), self.client.as_ref(), config, request).await
    }

    fn parse_response(&self, response: WireResponse) -> ProviderResult<Message> {
        Self::response_to_message(&response.body)
    }
}
