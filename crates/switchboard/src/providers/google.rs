use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
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

pub const GOOGLE_HOST: &str = "https://generativelanguage.googleapis.com";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

lazy_static! {
    static ref SYNTHETIC_ID: Regex = Regex::new(r"^call_(.+)_[0-9a-f]{8}$").unwrap();
}

/// Gemini supplies no call ids, so one is minted that embeds the function name
pub fn synthetic_tool_call_id(function_name: &str) -> String {
    format!("call_{}_{:08x}", function_name, rand::random::<u32>())
}

/// Recover the function name from an id minted by [`synthetic_tool_call_id`]
pub fn function_name_from_id(id: &str) -> Option<&str> {
    SYNTHETIC_ID
        .captures(id)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

/// id → function name for every assistant tool call in the conversation
fn tool_call_names(turns: &[&Message]) -> HashMap<String, String> {
    turns
        .iter()
        .flat_map(|message| message.tool_calls())
        .map(|call| (call.id.clone(), call.name.clone()))
        .collect()
}

fn parts(content: &Content) -> Vec<Value> {
    match content {
        Content::Text(text) => vec![json!({"text": text})],
        Content::Items(items) => items
            .iter()
            .map(|item| match item {
                ContentItem::Text { text, .. } => json!({"text": text}),
                ContentItem::Image {
                    mime_type, data, ..
                } => json!({"inlineData": {"mimeType": mime_type, "data": data}}),
            })
            .collect(),
    }
}

fn is_function_response_turn(content: &Value) -> bool {
    content["role"] == "user"
        && content["parts"].as_array().is_some_and(|parts| {
            !parts.is_empty() && parts.iter().all(|p| p.get("functionResponse").is_some())
        })
}

pub struct GoogleProvider {
    client: Arc<dyn HttpClient>,
    keys: Arc<dyn KeyStore>,
    host: String,
}

impl GoogleProvider {
    pub fn new(client: Arc<dyn HttpClient>, keys: Arc<dyn KeyStore>, host: String) -> Self {
        Self { client, keys, host }
    }

    fn messages_to_google_spec(turns: &[&Message]) -> ProviderResult<Vec<Value>> {
        let names = tool_call_names(turns);
        let mut contents: Vec<Value> = Vec::new();

        for message in turns {
            match message {
                Message::User { content } => {
                    contents.push(json!({"role": "user", "parts": parts(content)}))
                }
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut model_parts: Vec<Value> = if tool_calls.is_empty() {
                        parts(content)
                    } else {
                        parts(content)
                            .into_iter()
                            .filter(|part| part["text"] != "")
                            .collect()
                    };
                    model_parts.extend(tool_calls.iter().map(|call| {
                        json!({"functionCall": {"name": call.name, "args": call.arguments}})
                    }));
                    contents.push(json!({"role": "model", "parts": model_parts}));
                }
                Message::Tool {
                    content,
                    tool_call_id,
                } => {
                    let name = names
                        .get(tool_call_id)
                        .map(String::as_str)
                        .or_else(|| function_name_from_id(tool_call_id))
                        .ok_or_else(|| {
                            Error::validation(
                                ProviderType::Google.name(),
                                format!(
                                    "cannot determine the function name for tool_call_id '{}'",
                                    tool_call_id
                                ),
                            )
                        })?;
                    let part = json!({
                        "functionResponse": {
                            "name": name,
                            "response": {"name": name, "content": content.joined_text("")},
                        }
                    });
                    // Responses to parallel calls share one turn
                    let previous = contents
                        .last_mut()
                        .filter(|last| is_function_response_turn(last))
                        .and_then(|last| last["parts"].as_array_mut());
                    match previous {
                        Some(existing) => existing.push(part),
                        None => contents.push(json!({"role": "user", "parts": [part]})),
                    }
                }
                Message::System { .. } => {}
            }
        }

        Ok(contents)
    }

    fn tools_to_google_spec(tools: &[ToolDefinition]) -> Value {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|tool| {
                let mut declaration = json!({"name": tool.name});
                if let Some(description) = &tool.description {
                    declaration["description"] = json!(description);
                }
                if let Some(parameters) = &tool.parameters {
                    declaration["parameters"] = parameters.clone();
                }
                declaration
            })
            .collect();
        json!([{"functionDeclarations": declarations}])
    }

    /// Convert a single `content` object (`{role: "model", parts}`) to a canonical message
    pub fn content_to_message(content: &Value) -> Message {
        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        for part in content["parts"].as_array().into_iter().flatten() {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                if part["thought"] != true {
                    texts.push(text);
                }
            } else if let Some(call) = part.get("functionCall") {
                let name = call["name"].as_str().unwrap_or_default();
                let arguments = match &call["args"] {
                    Value::Null => json!({}),
                    args => args.clone(),
                };
                tool_calls.push(ToolCall::new(synthetic_tool_call_id(name), name, arguments));
            }
        }

        Message::Assistant {
            content: Content::Text(texts.join("\n")),
            tool_calls,
        }
    }

    pub fn response_to_message(response: &Value) -> ProviderResult<Message> {
        if response.get("error").is_some() {
            return Err(Error::provider(
                ProviderType::Google.name(),
                format!("Gemini API error: {}", error_message(response)),
            ));
        }

        match response["candidates"].get(0) {
            Some(candidate) => Ok(Self::content_to_message(&candidate["content"])),
            None => {
                let mut err = Error::provider(ProviderType::Google.name(), "response has no candidates");
                if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
                    err = Error::provider(
                        ProviderType::Google.name(),
                        format!("prompt was blocked: {}", reason),
                    )
                    .with_detail("block_reason", reason);
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Google
    }

    fn init(&self, model: &str, options: &CallOptions) -> ProviderResult<Config> {
        resolve_config(
            self.provider_type(),
            self.keys.as_ref(),
            model,
            options,
            &ProviderDefaults::default(),
            &self.host,
        )
    }

    fn format_request(&self, config: &Config, messages: &[Message]) -> ProviderResult<WireRequest> {
        let model = strip_provider_prefix(&config.model, self.provider_type());
        let split = split_system(messages);

        let mut generation_config = Map::new();
        if let Some(tokens) = config.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(tokens));
        }
        generation_config.insert("temperature".to_string(), json!(config.temperature));
        if let Some(top_p) = config.top_p {
            generation_config.insert("topP".to_string(), json!(top_p));
        }

        let mut payload = Map::new();
        payload.insert(
            "contents".to_string(),
            Value::Array(Self::messages_to_google_spec(&split.turns)?),
        );
        if let Some(system) = split.system_text() {
            payload.insert(
                "systemInstruction".to_string(),
                json!({"parts": [{"text": system}]}),
            );
        }
        payload.insert(
            "generationConfig".to_string(),
            Value::Object(generation_config),
        );
        payload.insert(
            "safetySettings".to_string(),
            HARM_CATEGORIES
                .iter()
                .map(|category| json!({"category": category, "threshold": "BLOCK_NONE"}))
                .collect(),
        );
        if !config.tools.is_empty() {
            payload.insert("tools".to_string(), Self::tools_to_google_spec(&config.tools));
        }

        debug!(provider = self.name(), model, "formatted request");
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            config.host,
            model,
            urlencoding::encode(&config.api_key)
        );

        Ok(WireRequest {
            url,
            headers: Vec::new(),
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
