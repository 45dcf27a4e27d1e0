//! Reassembly of streamed tool-call fragments.
//!
//! Fragments are keyed by the stream index the provider assigns. `id` and
//! `name` overwrite, argument text is appended in arrival order, and nothing
//! is parsed until the round's stream has ended.

use std::collections::BTreeMap;

use serde_json::Value;
use supperclub_core::message::MessageToolCall;
use supperclub_core::provider::ToolCallDelta;

#[derive(Debug, Default, Clone)]
struct Fragment {
    id: String,
    name: String,
    arguments: String,
}

/// Collects [`ToolCallDelta`]s for a single round.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    fragments: BTreeMap<u32, Fragment>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &ToolCallDelta) {
        let fragment = self.fragments.entry(delta.index).or_default();
        if let Some(id) = delta.id.as_deref().filter(|s| !s.is_empty()) {
            fragment.id = id.to_string();
        }
        if let Some(name) = delta.name.as_deref().filter(|s| !s.is_empty()) {
            fragment.name = name.to_string();
        }
        if let Some(args) = &delta.arguments {
            fragment.arguments.push_str(args);
        }
    }

    pub fn extend<'a>(&mut self, deltas: impl IntoIterator<Item = &'a ToolCallDelta>) {
        for delta in deltas {
            self.push(delta);
        }
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Finalize into invocations, ascending by stream index.
    pub fn finish(self) -> Vec<PendingInvocation> {
        self.fragments
            .into_iter()
            .map(|(index, f)| PendingInvocation::from_fragment(index, f))
            .collect()
    }
}

/// A complete tool call, ready to execute.
#[derive(Debug, Clone)]
pub struct PendingInvocation {
    pub id: String,
    pub name: String,
    /// The argument text exactly as streamed.
    pub raw_arguments: String,
    /// The decoded arguments, or the JSON error if the text did not parse.
    pub arguments: Result<Value, String>,
}

impl PendingInvocation {
    fn from_fragment(index: u32, f: Fragment) -> Self {
        let arguments = if f.arguments.trim().is_empty() {
            Ok(Value::Object(serde_json::Map::new()))
        } else {
            serde_json::from_str(&f.arguments).map_err(|e| e.to_string())
        };
        // A call without an id can't be answered; give it a stable one.
        let id = if f.id.is_empty() {
            format!("call_{index}")
        } else {
            f.id
        };
        Self {
            id,
            name: f.name,
            raw_arguments: f.arguments,
            arguments,
        }
    }

    /// The form recorded on the assistant message.
    pub fn to_message_call(&self) -> MessageToolCall {
        let arguments = if self.raw_arguments.trim().is_empty() {
            "{}".to_string()
        } else {
            self.raw_arguments.clone()
        };
        MessageToolCall {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments,
        }
    }

    /// Arguments as shown to observers: decoded when possible, raw text otherwise.
    pub fn display_arguments(&self) -> Value {
        match &self.arguments {
            Ok(v) => v.clone(),
            Err(_) => Value::String(self.raw_arguments.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finish(deltas: &[ToolCallDelta]) -> Vec<PendingInvocation> {
        let mut acc = ToolCallAccumulator::new();
        acc.extend(deltas);
        acc.finish()
    }

    #[test]
    fn split_arguments_match_single_delivery() {
        let split = finish(&[
            ToolCallDelta::start(0, "call_a", "search"),
            ToolCallDelta::args(0, r#"{"a":"#),
            ToolCallDelta::args(0, r#""1"}"#),
        ]);
        let whole = finish(&[
            ToolCallDelta::start(0, "call_a", "search"),
            ToolCallDelta::args(0, r#"{"a":"1"}"#),
        ]);
        assert_eq!(split[0].arguments, whole[0].arguments);
        assert_eq!(split[0].arguments, Ok(json!({ "a": "1" })));
    }

    #[test]
    fn order_follows_index_not_arrival() {
        let calls = finish(&[
            ToolCallDelta::start(0, "call_0", "get_friends_info"),
            ToolCallDelta::args(0, r#"{"friend_names":"#),
            ToolCallDelta::start(1, "call_1", "search_restaurants"),
            ToolCallDelta::args(1, r#"{"query":"sushi"}"#),
            ToolCallDelta::args(0, r#"["Alice"]}"#),
        ]);
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["get_friends_info", "search_restaurants"]);
        assert_eq!(calls[0].arguments, Ok(json!({ "friend_names": ["Alice"] })));
    }

    #[test]
    fn higher_index_first_still_sorts() {
        let calls = finish(&[
            ToolCallDelta::start(1, "call_1", "b"),
            ToolCallDelta::start(0, "call_0", "a"),
        ]);
        assert_eq!(calls[0].id, "call_0");
        assert_eq!(calls[1].id, "call_1");
    }

    #[test]
    fn no_arguments_is_empty_object() {
        let calls = finish(&[ToolCallDelta::start(0, "call_0", "get_friends_info")]);
        assert_eq!(calls[0].arguments, Ok(json!({})));
        assert_eq!(calls[0].to_message_call().arguments, "{}");
    }

    #[test]
    fn malformed_arguments_surface_as_error() {
        let calls = finish(&[
            ToolCallDelta::start(0, "call_0", "search"),
            ToolCallDelta::args(0, r#"{"query": "sus"#),
        ]);
        assert!(calls[0].arguments.is_err());
        assert_eq!(calls[0].display_arguments(), json!(r#"{"query": "sus"#));
        assert_eq!(calls[0].to_message_call().arguments, r#"{"query": "sus"#);
    }

    #[test]
    fn later_id_and_name_overwrite() {
        let calls = finish(&[
            ToolCallDelta::start(0, "tmp", "sear"),
            ToolCallDelta {
                index: 0,
                id: Some("call_real".into()),
                name: Some("search".into()),
                arguments: None,
            },
        ]);
        assert_eq!(calls[0].id, "call_real");
        assert_eq!(calls[0].name, "search");
    }

    #[test]
    fn missing_id_gets_index_based_id() {
        let calls = finish(&[ToolCallDelta {
            index: 3,
            id: None,
            name: Some("rank_and_score".into()),
            arguments: Some("{}".into()),
        }]);
        assert_eq!(calls[0].id, "call_3");
    }
}
