//! Message domain types.
//!
//! A message is one turn of a planning conversation. The chat API is strict
//! about ordering: every `tool` message must answer a `tool_calls` entry of an
//! earlier assistant message, and every requested call must be answered before
//! the next assistant turn is requested.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person planning the outing
    User,
    /// The model
    Assistant,
    /// Instructions and location notes
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content (may be empty for tool-only assistant turns)
    pub content: String,

    /// Tool calls requested by the assistant, in the order the model emitted them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tools(
        content: impl Into<String>,
        tool_calls: Vec<MessageToolCall>,
    ) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as the raw JSON text the model produced
    pub arguments: String,
}

/// Check the pairing invariant between assistant tool calls and tool replies.
///
/// Returns the id of the first offending tool message, or of the first
/// unanswered call when another assistant turn follows it.
pub fn find_unpaired_tool_call(messages: &[Message]) -> Option<String> {
    let mut pending: Vec<&str> = Vec::new();
    for msg in messages {
        match msg.role {
            Role::Assistant => {
                if let Some(open) = pending.first() {
                    return Some((*open).to_string());
                }
                pending = msg.tool_calls.iter().map(|tc| tc.id.as_str()).collect();
            }
            Role::Tool => {
                let id = msg.tool_call_id.as_deref().unwrap_or_default();
                match pending.iter().position(|p| *p == id) {
                    Some(pos) => {
                        pending.remove(pos);
                    }
                    None => return Some(id.to_string()),
                }
            }
            Role::User | Role::System => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> MessageToolCall {
        MessageToolCall {
            id: id.into(),
            name: "search_restaurants".into(),
            arguments: "{}".into(),
        }
    }

    #[test]
    fn create_user_message() {
        let msg = Message::user("Dinner for four in Palo Alto");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Dinner for four in Palo Alto");
        assert!(msg.tool_calls.is_empty());
        assert!(msg.tool_call_id.is_none());
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = Message::tool_result("call_1", "{}");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::system("x")).unwrap();
        assert!(json.contains(r#""role":"system""#));
    }

    #[test]
    fn well_formed_history_is_paired() {
        let history = vec![
            Message::system("prompt"),
            Message::user("hi"),
            Message::assistant_with_tools("", vec![call("a"), call("b")]),
            Message::tool_result("a", "{}"),
            Message::tool_result("b", "{}"),
            Message::assistant("done"),
        ];
        assert_eq!(find_unpaired_tool_call(&history), None);
    }

    #[test]
    fn orphan_tool_reply_is_reported() {
        let history = vec![Message::user("hi"), Message::tool_result("ghost", "{}")];
        assert_eq!(find_unpaired_tool_call(&history).as_deref(), Some("ghost"));
    }

    #[test]
    fn unanswered_call_before_next_assistant_is_reported() {
        let history = vec![
            Message::assistant_with_tools("", vec![call("a"), call("b")]),
            Message::tool_result("a", "{}"),
            Message::assistant("too early"),
        ];
        assert_eq!(find_unpaired_tool_call(&history).as_deref(), Some("b"));
    }
}
