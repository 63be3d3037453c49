use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::content::Content;
use super::tool::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
/// A message to or from an LLM, in canonical form
pub enum Message {
    System {
        content: Content,
    },
    User {
        content: Content,
    },
    Assistant {
        #[serde(default)]
        content: Content,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: Content,
        tool_call_id: String,
    },
}

impl Message {
    pub fn system<C: Into<Content>>(content: C) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user<C: Into<Content>>(content: C) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant<C: Into<Content>>(content: C) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A tool result answering the call with id `tool_call_id`
    pub fn tool<I: Into<String>, C: Into<Content>>(tool_call_id: I, content: C) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Add a tool call; a no-op on anything but an assistant message
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        if let Message::Assistant { tool_calls, .. } = &mut self {
            tool_calls.push(call);
        }
        self
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    pub fn content(&self) -> &Content {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Message::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Body flattened to text, items joined without separator
    pub fn text(&self) -> String {
        self.content().joined_text("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::ContentItem;
    use serde_json::json;

    #[test]
    fn test_message_serializes_to_raw_shape() {
        let message = Message::assistant("").with_tool_call(ToolCall::new(
            "call_1",
            "get_weather",
            json!({"city": "Paris"}),
        ));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [{"id": "call_1", "name": "get_weather", "arguments": {"city": "Paris"}}]
            })
        );

        let tool = Message::tool("call_1", "sunny");
        assert_eq!(
            serde_json::to_value(&tool).unwrap(),
            json!({"role": "tool", "content": "sunny", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn test_message_accessors() {
        let message = Message::user(vec![ContentItem::text("a"), ContentItem::text("b")]);
        assert_eq!(message.role(), Role::User);
        assert_eq!(message.text(), "ab");
        assert!(message.tool_calls().is_empty());
        assert_eq!(message.tool_call_id(), None);
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn test_with_tool_call_ignores_non_assistant() {
        let message = Message::user("hi").with_tool_call(ToolCall::new("1", "f", json!({})));
        assert!(message.tool_calls().is_empty());
    }
}
