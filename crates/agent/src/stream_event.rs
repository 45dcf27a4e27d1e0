//! Agent-level streaming events.
//!
//! `AgentStreamEvent` is what a run emits, in order. The gateway forwards
//! every event except [`AgentStreamEvent::SessionRef`] as a `{type, content}`
//! record; the session reference is internal and becomes the leading
//! `session` record instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Events emitted by a planning run.
///
/// Within one round: zero or more `TextDelta`s, then either `FinalDone`, or
/// `ThinkingDone` followed by one `ToolCall`/`ToolResult` pair per requested
/// call, in request order.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStreamEvent {
    /// The session this run is bound to. Always first, never forwarded as-is.
    SessionRef { session_id: String },

    /// Partial text from the model, forwarded as it arrives.
    TextDelta(String),

    /// The text so far was reasoning; tool calls follow.
    ThinkingDone,

    /// The text so far was the final answer.
    FinalDone,

    /// A tool is about to run.
    ToolCall { tool: String, args: Value },

    /// A tool finished, successfully or with an `{error}` payload.
    ToolResult { tool: String, result: Value },

    /// The run ended abnormally.
    Error(String),
}

impl AgentStreamEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionRef { .. } => "_session_ref",
            Self::TextDelta(_) => "text_delta",
            Self::ThinkingDone => "thinking_done",
            Self::FinalDone => "final_done",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Error(_) => "error",
        }
    }

    /// Events that must not cross the external boundary.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::SessionRef { .. })
    }

    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinalDone | Self::Error(_))
    }

    /// The external record for this event, or `None` for internal kinds.
    pub fn to_wire(&self) -> Option<WireEvent> {
        let content = match self {
            Self::SessionRef { .. } => return None,
            Self::TextDelta(text) => Value::String(text.clone()),
            Self::ThinkingDone | Self::FinalDone => Value::String(String::new()),
            Self::ToolCall { tool, args } => serde_json::json!({ "tool": tool, "args": args }),
            Self::ToolResult { tool, result } => {
                serde_json::json!({ "tool": tool, "result": result })
            }
            Self::Error(message) => Value::String(message.clone()),
        };
        Some(WireEvent {
            kind: self.event_type().to_string(),
            content,
        })
    }
}

/// One `{type, content}` record of the external event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Value,
}

impl WireEvent {
    /// The leading record that tells the caller which session it is in.
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            kind: "session".into(),
            content: Value::String(session_id.into()),
        }
    }

    /// The record as JSON; an encoding failure becomes an `error` record.
    pub fn to_json(&self) -> String {
        encode_or_error(self, &self.kind)
    }
}

const ENCODE_FAILED: &str = r#"{"type":"error","content":"Failed to encode event"}"#;

fn encode_or_error<T: Serialize>(record: &T, kind: &str) -> String {
    match serde_json::to_string(record) {
        Ok(json) => json,
        Err(e) => {
            warn!(kind, error = %e, "Failed to encode stream event");
            ENCODE_FAILED.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_ref_is_internal() {
        let ev = AgentStreamEvent::SessionRef {
            session_id: "ab12cd34".into(),
        };
        assert!(ev.is_internal());
        assert!(ev.to_wire().is_none());
        assert_eq!(ev.event_type(), "_session_ref");
    }

    #[test]
    fn markers_carry_empty_content() {
        let wire = AgentStreamEvent::ThinkingDone.to_wire().unwrap();
        assert_eq!(wire.to_json(), r#"{"type":"thinking_done","content":""}"#);
    }

    #[test]
    fn tool_events_nest_tool_name() {
        let wire = AgentStreamEvent::ToolCall {
            tool: "search_restaurants".into(),
            args: json!({ "query": "sushi" }),
        }
        .to_wire()
        .unwrap();
        assert_eq!(wire.kind, "tool_call");
        assert_eq!(wire.content["tool"], "search_restaurants");
        assert_eq!(wire.content["args"]["query"], "sushi");

        let wire = AgentStreamEvent::ToolResult {
            tool: "search_restaurants".into(),
            result: json!({ "error": "Unknown tool: x" }),
        }
        .to_wire()
        .unwrap();
        assert_eq!(wire.content["result"]["error"], "Unknown tool: x");
    }

    #[test]
    fn text_is_not_ascii_escaped() {
        let wire = AgentStreamEvent::TextDelta("寿司".into()).to_wire().unwrap();
        assert!(wire.to_json().contains("寿司"));
    }

    #[test]
    fn session_record() {
        assert_eq!(
            WireEvent::session("ab12cd34").to_json(),
            r#"{"type":"session","content":"ab12cd34"}"#
        );
    }

    #[test]
    fn terminal_kinds() {
        assert!(AgentStreamEvent::FinalDone.is_terminal());
        assert!(AgentStreamEvent::Error("x".into()).is_terminal());
        assert!(!AgentStreamEvent::ThinkingDone.is_terminal());
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not encodable"))
        }
    }

    #[test]
    fn encoding_failure_becomes_error_record() {
        let json = encode_or_error(&Unencodable, "tool_result");
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "error");
        assert_eq!(parsed["content"], "Failed to encode event");
    }
}
