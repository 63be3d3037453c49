use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use super::base::{WireRequest, WireResponse};
use super::configs::{CallOptions, Config, ProviderDefaults};
use super::factory::ProviderType;
use super::http::{HttpClient, HttpRequest};
use crate::errors::{Error, ProviderResult};
use crate::key_manager::{env_var_names, KeyStore};
use crate::models::content::{Content, ContentItem};
use crate::models::message::Message;
use crate::models::tool::{ToolCall, ToolDefinition};

/// Which content item kinds an adapter forwards to the wire
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContentPolicy {
    /// Text and image items are both sent
    Multimodal,
    /// Non-text items are dropped without error
    TextOnly,
}

impl ContentPolicy {
    pub fn allows(&self, item: &ContentItem) -> bool {
        match self {
            ContentPolicy::Multimodal => true,
            ContentPolicy::TextOnly => !item.is_image(),
        }
    }

    /// Items that survive this policy, in order
    pub fn filter<'a>(&self, items: &'a [ContentItem]) -> Vec<&'a ContentItem> {
        items
            .iter()
            .filter(|item| {
                let allowed = self.allows(item);
                if !allowed {
                    debug!(policy = ?self, "dropping non-text content item");
                }
                allowed
            })
            .collect()
    }
}

/// Conversation with its system instruction pulled out
#[derive(Debug, Default)]
pub struct SystemSplit<'a> {
    pub system: Vec<ContentItem>,
    pub turns: Vec<&'a Message>,
}

impl SystemSplit<'_> {
    /// System text items joined with a blank line
    pub fn system_text(&self) -> Option<String> {
        let texts: Vec<&str> = self.system.iter().filter_map(ContentItem::as_text).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n\n"))
        }
    }
}

/// Pull every system message out of the turn list; none ever reaches the wire as a turn
pub fn split_system(messages: &[Message]) -> SystemSplit<'_> {
    let mut split = SystemSplit::default();
    for message in messages {
        match message {
            Message::System { content } => split.system.extend(content.to_items()),
            other => split.turns.push(other),
        }
    }
    split
}

/// Drop `"<prefix>/"` from a model string, if present
pub fn strip_provider_prefix<'a>(model: &'a str, provider: ProviderType) -> &'a str {
    model
        .strip_prefix(provider.name())
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(model)
}

/// GPT-5 and o-series models reject `temperature` and use `max_completion_tokens`
pub fn is_reasoning_model(model: &str) -> bool {
    let model = model.rsplit('/').next().unwrap_or(model);
    ["o1", "o3", "o4", "gpt-5"].iter().any(|prefix| {
        model == *prefix
            || model
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('.'))
    })
}

/// OpenAI-compatible vendors read 0 as "unset", so send a tiny positive value instead
pub fn openai_compatible_temperature(temperature: f64) -> f64 {
    if temperature == 0.0 {
        1e-8
    } else if temperature > 0.0 && temperature <= 2.0 {
        temperature
    } else {
        1.0
    }
}

/// Shared `init` stage: resolve options, then attach the provider credential
pub fn resolve_config(
    provider: ProviderType,
    keys: &dyn KeyStore,
    model: &str,
    options: &CallOptions,
    defaults: &ProviderDefaults,
    host: &str,
) -> ProviderResult<Config> {
    let config = Config::new(model, options, defaults, host)
        .map_err(|e| Error::from_configuration(provider.name(), e))?;

    let api_key = keys.api_key(provider).ok_or_else(|| {
        Error::configuration(
            provider.name(),
            format!(
                "missing API key for {}; set {}",
                provider.name(),
                env_var_names(provider).join(" or ")
            ),
        )
    })?;

    Ok(config.with_api_key(api_key))
}

/// Best description of an upstream failure found in a response body
pub fn error_message(body: &Value) -> String {
    body.get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(|m| m.as_str().map(String::from))
        .or_else(|| body.as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

/// Map a transport response onto the error taxonomy
pub fn check_status(provider: ProviderType, response: WireResponse) -> ProviderResult<WireResponse> {
    let status = response.status;
    match status {
        200..=299 => Ok(response),
        401 => {
            warn!(provider = provider.name(), status, "authentication rejected");
            Err(
                Error::authentication(provider.name(), error_message(&response.body))
                    .with_detail("status", status)
                    .with_detail("body", response.body),
            )
        }
        _ => {
            warn!(provider = provider.name(), status, "request failed");
            Err(Error::provider(
                provider.name(),
                format!("Request failed: {}: {}", status, error_message(&response.body)),
            )
            .with_detail("status", status)
            .with_detail("body", response.body))
        }
    }
}

/// Shared `call` stage: hand the request to the transport, then check the status
pub async fn post(
    provider: ProviderType,
    client: &dyn HttpClient,
    config: &Config,
    request: WireRequest,
) -> ProviderResult<WireResponse> {
    let http_request = HttpRequest {
        json: request.body,
        headers: request.headers,
        timeout: config.timeout(),
    };

    let response = client
        .post(&request.url, http_request)
        .await
        .map_err(|e| {
            error!(provider = provider.name(), reason = %e.reason, "transport failure");
            Error::network(provider.name(), e.reason)
        })?;

    check_status(provider, response)
}

fn openai_content(content: &Content, policy: ContentPolicy) -> Value {
    match content {
        Content::Text(text) => json!(text),
        Content::Items(items) => {
            let kept = policy.filter(items);
            // no image survived: one string, never an empty part list
            if kept.iter().all(|item| !item.is_image()) {
                return json!(kept
                    .iter()
                    .filter_map(|item| item.as_text())
                    .collect::<Vec<_>>()
                    .join("\n"));
            }
            Value::Array(
                kept.into_iter()
                    .map(|item| match item {
                        ContentItem::Text { text, .. } => json!({"type": "text", "text": text}),
                        ContentItem::Image {
                            mime_type, data, ..
                        } => json!({
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:{};base64,{}", mime_type, data)
                            }
                        }),
                    })
                    .collect(),
            )
        }
    }
}

/// Convert canonical turns to OpenAI's chat message specification
///
/// System messages must already be split out; see [`split_system`].
pub fn messages_to_openai_spec(turns: &[&Message], policy: ContentPolicy) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in turns {
        let converted = match message {
            Message::User { content } => json!({
                "role": "user",
                "content": openai_content(content, policy),
            }),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let mut converted = json!({"role": "assistant"});
                let text = content.joined_text("");
                if tool_calls.is_empty() {
                    converted["content"] = json!(text);
                } else {
                    converted["content"] = if text.is_empty() {
                        Value::Null
                    } else {
                        json!(text)
                    };
                    converted["tool_calls"] = tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                }
                converted
            }
            Message::Tool {
                content,
                tool_call_id,
            } => json!({
                "role": "tool",
                "content": content.joined_text(""),
                "tool_call_id": tool_call_id,
            }),
            // not produced by split_system
            Message::System { content } => json!({
                "role": "developer",
                "content": content.joined_text("\n\n"),
            }),
        };
        messages_spec.push(converted);
    }

    messages_spec
}

/// Convert tool definitions to OpenAI's function tool specification
pub fn tools_to_openai_spec(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            let mut function = json!({
                "name": tool.name,
                "parameters": tool.parameters_or_empty(),
            });
            if let Some(description) = &tool.description {
                function["description"] = json!(description);
            }
            json!({"type": "function", "function": function})
        })
        .collect()
}

/// Build the OpenAI-compatible chat completion payload
pub fn openai_payload(
    provider: ProviderType,
    config: &Config,
    messages: &[Message],
    policy: ContentPolicy,
) -> Value {
    let model = strip_provider_prefix(&config.model, provider);
    let split = split_system(messages);

    let mut messages_array = Vec::new();
    if let Some(system) = split.system_text() {
        messages_array.push(json!({"role": "developer", "content": system}));
    }
    messages_array.extend(messages_to_openai_spec(&split.turns, policy));

    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(model));
    payload.insert("messages".to_string(), Value::Array(messages_array));

    let reasoning = is_reasoning_model(model);
    if let Some(tokens) = config.max_tokens {
        let key = if reasoning {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };
        payload.insert(key.to_string(), json!(tokens));
    }
    if !reasoning {
        payload.insert("temperature".to_string(), json!(config.temperature));
    }
    if let Some(top_p) = config.top_p {
        payload.insert("top_p".to_string(), json!(top_p));
    }
    if !config.tools.is_empty() {
        payload.insert(
            "tools".to_string(),
            Value::Array(tools_to_openai_spec(&config.tools)),
        );
    }

    Value::Object(payload)
}

/// OpenAI-compatible error codes meaning the prompt did not fit
pub fn check_openai_context_length_error(error: &Value) -> Option<String> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        Some(code.to_string())
    } else {
        None
    }
}

/// Convert OpenAI's API response to a canonical message
pub fn openai_response_to_message(provider: ProviderType, response: &Value) -> ProviderResult<Message> {
    if let Some(error) = response.get("error") {
        let mut err = Error::provider(
            provider.name(),
            format!("{} API error: {}", provider.name(), error_message(response)),
        );
        if let Some(code) = check_openai_context_length_error(error) {
            err = err.with_detail("code", code);
        }
        return Err(err);
    }

    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| Error::provider(provider.name(), "response has no choices[0].message"))?;

    // content is null when the model only requested tools
    let content = original
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(tool_calls_array) = original.get("tool_calls").and_then(Value::as_array) {
        for tool_call in tool_calls_array {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = match &tool_call["function"]["arguments"] {
                Value::String(encoded) if encoded.trim().is_empty() => json!({}),
                Value::String(encoded) => serde_json::from_str::<Value>(encoded).map_err(|e| {
                    Error::provider(
                        provider.name(),
                        format!(
                            "Could not interpret tool use parameters for id {}: {}",
                            id, e
                        ),
                    )
                })?,
                Value::Null => json!({}),
                other => other.clone(),
            };
            tool_calls.push(ToolCall::new(id, function_name, arguments));
        }
    }

    Ok(Message::Assistant {
        content: Content::Text(content),
        tool_calls,
    })
}
