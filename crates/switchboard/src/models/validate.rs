//! Boundary between loosely-typed caller input and the canonical [`Message`].
//!
//! Raw messages arrive as JSON objects whose keys may be atom-style
//! (`":role"`) or camelCase (`"toolCallId"`). Keys are normalized first, then
//! the shape is checked and the first violation is reported. Nothing untyped
//! gets past this module.

use serde_json::{Map, Value};

use super::content::{Content, ContentItem};
use super::message::Message;
use super::tool::ToolCall;
use crate::errors::ValidationError;

type Result<T> = std::result::Result<T, ValidationError>;

/// Fold a raw key onto the canonical snake_case key set
pub fn normalize_key(key: &str) -> String {
    let key = key.strip_prefix(':').unwrap_or(key);
    let mut normalized = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                normalized.push('_');
            }
            normalized.push(ch.to_ascii_lowercase());
        } else {
            normalized.push(ch);
        }
    }
    normalized
}

fn normalize_object(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .map(|(key, value)| (normalize_key(key), value.clone()))
        .collect()
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(format!("{} must be an object", what)))
}

fn required_str<'a>(object: &'a Map<String, Value>, key: &str, what: &str) -> Result<&'a str> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::new(format!(
            "{} field '{}' must be a string",
            what, key
        ))),
        None => Err(ValidationError::new(format!(
            "{} is missing required field '{}'",
            what, key
        ))),
    }
}

fn cache_flag(object: &Map<String, Value>, what: &str) -> Result<bool> {
    match object.get("cache") {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(ValidationError::new(format!(
            "{} field 'cache' must be a boolean",
            what
        ))),
    }
}

fn validate_content_item(raw: &Value, index: usize) -> Result<ContentItem> {
    let what = format!("content item {}", index);
    let item = normalize_object(as_object(raw, &what)?);

    match item.get("type").and_then(Value::as_str) {
        Some("text") => Ok(ContentItem::Text {
            text: required_str(&item, "text", &what)?.to_string(),
            cache: cache_flag(&item, &what)?,
        }),
        Some("image") => Ok(ContentItem::Image {
            mime_type: required_str(&item, "mime_type", &what)?.to_string(),
            data: required_str(&item, "data", &what)?.to_string(),
            cache: cache_flag(&item, &what)?,
        }),
        Some(other) => Err(ValidationError::new(format!(
            "{} has unsupported type '{}', expected 'text' or 'image'",
            what, other
        ))),
        None => Err(ValidationError::new(format!(
            "{} is missing required field 'type'",
            what
        ))),
    }
}

fn validate_content(raw: Option<&Value>, optional: bool) -> Result<Content> {
    match raw {
        Some(Value::String(text)) => Ok(Content::Text(text.clone())),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| validate_content_item(item, i))
            .collect::<Result<Vec<_>>>()
            .map(Content::Items),
        None | Some(Value::Null) if optional => Ok(Content::default()),
        None | Some(Value::Null) => Err(ValidationError::new(
            "message is missing required field 'content'",
        )),
        Some(_) => Err(ValidationError::new(
            "message content must be a string or a list of content items",
        )),
    }
}

fn validate_tool_call(raw: &Value, index: usize) -> Result<ToolCall> {
    let what = format!("tool call {}", index);
    let call = normalize_object(as_object(raw, &what)?);

    let id = required_str(&call, "id", &what)?;
    let name = required_str(&call, "name", &what)?;
    let arguments = match call.get("arguments") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(Value::Object(arguments)) => Value::Object(arguments.clone()),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(decoded @ Value::Object(_)) => decoded,
            _ => {
                return Err(ValidationError::new(format!(
                    "{} arguments must encode a JSON object",
                    what
                )))
            }
        },
        Some(_) => {
            return Err(ValidationError::new(format!(
                "{} arguments must be an object",
                what
            )))
        }
    };

    Ok(ToolCall::new(id, name, arguments))
}

/// Validate a single raw message
pub fn validate_message(raw: &Value) -> Result<Message> {
    let message = normalize_object(as_object(raw, "message")?);

    let role = match message.get("role") {
        Some(Value::String(role)) => role.strip_prefix(':').unwrap_or(role),
        Some(_) => return Err(ValidationError::new("message role must be a string")),
        None => return Err(ValidationError::new("message is missing required field 'role'")),
    };

    match role {
        "system" => Ok(Message::System {
            content: validate_content(message.get("content"), false)?,
        }),
        "user" => Ok(Message::User {
            content: validate_content(message.get("content"), false)?,
        }),
        "assistant" => {
            let tool_calls = match message.get("tool_calls") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(calls)) => calls
                    .iter()
                    .enumerate()
                    .map(|(i, call)| validate_tool_call(call, i))
                    .collect::<Result<Vec<_>>>()?,
                Some(_) => return Err(ValidationError::new("tool_calls must be a list")),
            };
            Ok(Message::Assistant {
                content: validate_content(message.get("content"), true)?,
                tool_calls,
            })
        }
        "tool" => {
            let tool_call_id = match message.get("tool_call_id") {
                Some(Value::String(id)) => id.clone(),
                Some(_) => return Err(ValidationError::new("tool_call_id must be a string")),
                None => {
                    return Err(ValidationError::new(
                        "tool message is missing required field 'tool_call_id'",
                    ))
                }
            };
            Ok(Message::Tool {
                content: validate_content(message.get("content"), false)?,
                tool_call_id,
            })
        }
        other => Err(ValidationError::new(format!(
            "invalid role '{}', expected one of user, assistant, system, tool",
            other
        ))),
    }
}

/// Validate a whole conversation; all-or-nothing, first failure wins
pub fn validate_messages(raw: &[Value]) -> Result<Vec<Message>> {
    raw.iter()
        .enumerate()
        .map(|(i, message)| {
            validate_message(message)
                .map_err(|err| ValidationError::new(format!("message {}: {}", i, err)))
        })
        .collect()
}
