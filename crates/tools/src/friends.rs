//! Friend roster and the `get_friends_info` tool.
//!
//! The roster is a static lookup table: loaded once at startup (from the
//! embedded sample or a configured JSON file) and shared read-only.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use supperclub_core::error::ToolError;
use supperclub_core::tool::{Tool, ToolContext};

const BUILTIN_ROSTER: &str = include_str!("../data/friends.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendLocation {
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub dietary: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    /// Anything else a roster file carries is passed through to the model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    pub name: String,
    pub location: FriendLocation,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("Failed to read friend roster at {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse friend roster: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FriendRoster {
    pub friends: Vec<Friend>,
}

impl FriendRoster {
    /// The roster shipped with the binary.
    pub fn builtin() -> Result<Self, RosterError> {
        Self::from_json(BUILTIN_ROSTER)
    }

    pub fn from_json(json: &str) -> Result<Self, RosterError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let content = std::fs::read_to_string(path).map_err(|e| RosterError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Load from `path` when given, otherwise the built-in roster.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, RosterError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    /// Case-insensitive lookup by name; surrounding whitespace is ignored.
    pub fn find(&self, name: &str) -> Option<&Friend> {
        let key = name.trim().to_lowercase();
        self.friends.iter().find(|f| f.name.to_lowercase() == key)
    }

    /// `- Name (address)` lines, one per friend.
    pub fn prompt_lines(&self) -> String {
        self.friends
            .iter()
            .map(|f| format!("- {} ({})", f.name, f.location.address))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.friends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.friends.is_empty()
    }
}

pub struct GetFriendsInfoTool {
    roster: Arc<FriendRoster>,
}

impl GetFriendsInfoTool {
    pub fn new(roster: Arc<FriendRoster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Tool for GetFriendsInfoTool {
    fn name(&self) -> &str {
        "get_friends_info"
    }

    fn description(&self) -> &str {
        "Look up friends' locations and dining preferences from the database. \
         Call this first so you know where everyone is and what they like/dislike."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "friend_names": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of friend names to look up"
                }
            },
            "required": ["friend_names"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        let names = arguments["friend_names"].as_array().ok_or_else(|| {
            ToolError::InvalidArguments("Missing 'friend_names' argument".into())
        })?;

        let mut results = serde_json::Map::new();
        for name in names.iter().filter_map(|n| n.as_str()) {
            match self.roster.find(name) {
                Some(friend) => {
                    let record = serde_json::to_value(friend).map_err(|e| {
                        ToolError::ExecutionFailed {
                            tool_name: self.name().into(),
                            reason: e.to_string(),
                        }
                    })?;
                    results.insert(friend.name.clone(), record);
                }
                None => {
                    results.insert(
                        name.to_string(),
                        serde_json::json!({
                            "error": format!("Friend '{name}' not found in database")
                        }),
                    );
                }
            }
        }

        Ok(serde_json::Value::Object(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> GetFriendsInfoTool {
        GetFriendsInfoTool::new(Arc::new(FriendRoster::builtin().unwrap()))
    }

    #[test]
    fn builtin_roster_parses() {
        let roster = FriendRoster::builtin().unwrap();
        assert!(roster.len() >= 4);
        assert!(roster.friends.iter().all(|f| f.location.lat != 0.0));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let roster = FriendRoster::builtin().unwrap();
        assert_eq!(roster.find("  alice ").unwrap().name, "Alice");
        assert!(roster.find("Zed").is_none());
    }

    #[test]
    fn prompt_lines_format() {
        let roster = FriendRoster::from_json(
            r#"{"friends":[{"name":"Ana","location":{"address":"Oakland, CA","lat":37.8,"lng":-122.27}}]}"#,
        )
        .unwrap();
        assert_eq!(roster.prompt_lines(), "- Ana (Oakland, CA)");
        assert!(roster.friends[0].preferences.likes.is_empty());
    }

    #[test]
    fn unknown_preference_fields_pass_through() {
        let roster = FriendRoster::from_json(
            r#"{"friends":[{"name":"Ana","location":{"lat":1.0,"lng":2.0},"preferences":{"likes":["tapas"],"favorite_drink":"horchata"}}]}"#,
        )
        .unwrap();
        let value = serde_json::to_value(&roster.friends[0]).unwrap();
        assert_eq!(value["preferences"]["favorite_drink"], "horchata");
        assert_eq!(value["preferences"]["likes"][0], "tapas");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("friends.json");
        std::fs::write(
            &path,
            r#"{"friends":[{"name":"Kai","location":{"address":"Daly City","lat":37.7,"lng":-122.47}}]}"#,
        )
        .unwrap();
        let roster = FriendRoster::load_or_builtin(Some(&path)).unwrap();
        assert_eq!(roster.len(), 1);

        let missing = FriendRoster::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, RosterError::Read { .. }));
    }

    #[tokio::test]
    async fn known_and_unknown_friends() {
        let result = tool()
            .execute(
                serde_json::json!({"friend_names": ["bob", "Zed"]}),
                &ToolContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(result["Bob"]["location"]["address"], "Downtown Palo Alto, CA");
        assert_eq!(result["Zed"]["error"], "Friend 'Zed' not found in database");
    }

    #[tokio::test]
    async fn missing_names_is_invalid() {
        let err = tool()
            .execute(serde_json::json!({}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
