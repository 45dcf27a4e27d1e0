//! Context construction for each model round.
//!
//! A run starts in [`ContextMode::Full`], where the model sees the whole
//! session history. Once the enrichment tool has run, the loop switches to
//! [`ContextMode::Presentation`]: a condensed instruction plus one user
//! message carrying the original request and the results of the tools that
//! matter for the final answer. Search and validation chatter is dropped.

use std::collections::HashMap;

use supperclub_config::{AgentConfig, CollectMode, PresentationToolConfig};
use supperclub_core::message::{Message, Role};

const PRESENTATION_PROMPT: &str = "\
You are the Group Dining Planner presenting final recommendations. All the \
data you need has already been gathered and is included in the user message. \
Do not ask for more information and do not mention tools.

Present the top 3 restaurants. For each one give the name, cuisine, Google and \
Yelp ratings, price level and address; the drive time for every person \
including \"Me\"; the score breakdown; highlights from reviews and popular \
dishes; the phone number prefixed with 📞; and one or two sentences on why it \
suits this group, with any trade-offs.

Respond in the same language as the user's request. This is your last message.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextMode {
    #[default]
    Full,
    Presentation,
}

/// Which tool triggers presentation mode and which results it keeps.
#[derive(Debug, Clone)]
pub struct PresentationPolicy {
    pub enrichment_tool: String,
    pub sections: Vec<PresentationToolConfig>,
}

impl PresentationPolicy {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            enrichment_tool: config.enrichment_tool.clone(),
            sections: config.presentation_tools.clone(),
        }
    }

    /// Whether executing these tools flips the run into presentation mode.
    pub fn triggered_by<'a>(&self, executed: impl IntoIterator<Item = &'a str>) -> bool {
        executed.into_iter().any(|name| name == self.enrichment_tool)
    }
}

impl Default for PresentationPolicy {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

/// The messages to send for one round.
pub fn build_context(
    history: &[Message],
    mode: ContextMode,
    policy: &PresentationPolicy,
) -> Vec<Message> {
    match mode {
        ContextMode::Full => history.to_vec(),
        ContextMode::Presentation => presentation_context(history, policy),
    }
}

/// The two-message presentation context.
pub fn presentation_context(history: &[Message], policy: &PresentationPolicy) -> Vec<Message> {
    vec![
        Message::system(PRESENTATION_PROMPT),
        Message::user(presentation_request(history, policy)),
    ]
}

fn presentation_request(history: &[Message], policy: &PresentationPolicy) -> String {
    let mut users = history.iter().filter(|m| m.role == Role::User);
    let first = users.next().map(|m| m.content.as_str()).unwrap_or_default();
    let latest = users.last().map(|m| m.content.as_str());

    let mut out = format!("Original request: {first}\n");
    if let Some(latest) = latest.filter(|l| *l != first) {
        out.push_str(&format!("Latest message: {latest}\n"));
    }

    let results = results_by_tool(history);
    let mut sections = Vec::new();
    for section in &policy.sections {
        let Some(payloads) = results.get(section.tool.as_str()) else {
            continue;
        };
        match section.mode {
            CollectMode::Latest => {
                if let Some(last) = payloads.last() {
                    sections.push(format!("## {}\n{}", section.tool, last));
                }
            }
            CollectMode::All => {
                let calls: Vec<String> = payloads
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("### Call {}\n{}", i + 1, p))
                    .collect();
                sections.push(format!("## {}\n{}", section.tool, calls.join("\n\n")));
            }
        }
    }

    if !sections.is_empty() {
        out.push_str("\nData gathered for this request:\n\n");
        out.push_str(&sections.join("\n\n"));
    }
    out
}

/// Tool-result payloads grouped by tool name, in history order.
fn results_by_tool(history: &[Message]) -> HashMap<&str, Vec<&str>> {
    let mut names: HashMap<&str, &str> = HashMap::new();
    let mut results: HashMap<&str, Vec<&str>> = HashMap::new();

    for msg in history {
        match msg.role {
            Role::Assistant => {
                for call in &msg.tool_calls {
                    names.insert(call.id.as_str(), call.name.as_str());
                }
            }
            Role::Tool => {
                let name = msg
                    .tool_call_id
                    .as_deref()
                    .and_then(|id| names.get(id).copied());
                if let Some(name) = name {
                    results.entry(name).or_default().push(msg.content.as_str());
                }
            }
            Role::User | Role::System => {}
        }
    }
    results
}
