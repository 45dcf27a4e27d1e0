//! Tool trait: the abstraction over the planner's capabilities.
//!
//! Tools are what let the model act: look up friends, search restaurants,
//! compute drive times, score candidates, and so on. Each tool receives the
//! model-supplied JSON arguments plus a [`ToolContext`] describing the run it
//! is part of.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ToolError;
use crate::location::UserLocation;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Per-run context handed to every tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Where the planning user is, if the client told us.
    pub user_location: Option<UserLocation>,
}

impl ToolContext {
    pub fn new(user_location: Option<UserLocation>) -> Self {
        Self { user_location }
    }

    /// The user location, but only when it carries a real fix.
    pub fn known_location(&self) -> Option<&UserLocation> {
        crate::location::known(self.user_location.as_ref())
    }
}

/// The core Tool trait.
///
/// Tools may have side effects. The loop executes exactly the invocations
/// the model requested, once each.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "search_restaurants").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    ///
    /// Recoverable upstream problems should be reported inside the returned
    /// JSON (as `{"error": ...}`); `Err` is for failures of the call itself.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them
///
/// Built once at startup and shared read-only between runs.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Execute a tool call.
    pub async fn execute(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(call.arguments.clone(), ctx).await
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports back where the caller is.
    struct WhereAmITool;

    #[async_trait]
    impl Tool for WhereAmITool {
        fn name(&self) -> &str {
            "where_am_i"
        }
        fn description(&self) -> &str {
            "Echoes the user location"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object", "properties": {} })
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
            ctx: &ToolContext,
        ) -> Result<serde_json::Value, ToolError> {
            let loc = ctx
                .known_location()
                .ok_or_else(|| ToolError::InvalidArguments("no location".into()))?;
            Ok(serde_json::json!({ "lat": loc.lat, "lng": loc.lng }))
        }
    }

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "named"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object" })
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(WhereAmITool));
        assert!(registry.get("where_am_i").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NamedTool("zeta")));
        registry.register(Box::new(NamedTool("alpha")));
        registry.register(Box::new(NamedTool("zeta")));
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn registry_passes_context_to_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(WhereAmITool));

        let call = ToolCall {
            id: "call_1".into(),
            name: "where_am_i".into(),
            arguments: serde_json::json!({}),
        };
        let ctx = ToolContext::new(Some(UserLocation::new(37.4, -122.1, "")));
        let result = registry.execute(&call, &ctx).await.unwrap();
        assert_eq!(result["lat"], 37.4);

        let err = registry
            .execute(&call, &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: serde_json::json!({}),
        };
        let err = registry
            .execute(&call, &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
