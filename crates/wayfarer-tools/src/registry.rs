//! Registry - Tool registration and discovery
//!
//! Tools are registered once at startup and looked up by name when the model
//! asks for them, or by category when an agent is assembled.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// What a tool is about, used to hand tool sets to specialist agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Flight search and pricing
    Flights,
    /// Seat availability on specific flights
    FlightSeats,
    /// Hotel search
    Hotels,
    /// Train search and status
    Rail,
    /// Points of interest
    Places,
    /// Routes between places
    Routes,
    /// Weather and air quality
    Weather,
    /// A specialist agent exposed as a tool
    Agent,
}

impl ToolCategory {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flights => "flights",
            Self::FlightSeats => "flight_seats",
            Self::Hotels => "hotels",
            Self::Rail => "rail",
            Self::Places => "places",
            Self::Routes => "routes",
            Self::Weather => "weather",
            Self::Agent => "agent",
        }
    }
}

/// Tool metadata and schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
    /// Tool category
    pub category: ToolCategory,
}

impl ToolDefinition {
    /// Create a new tool definition with an empty object schema
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            category: ToolCategory::Agent,
        }
    }

    /// Set the parameters schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: ToolCategory) -> Self {
        self.category = category;
        self
    }

    /// Function-calling declaration for the model
    #[must_use]
    pub fn to_llm(&self) -> wayfarer_llm::ToolDefinition {
        wayfarer_llm::ToolDefinition::new(&self.name, &self.description, self.parameters.clone())
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Output data
    pub output: serde_json::Value,
    /// Error message if failed
    pub error: Option<String>,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    /// Create a successful result
    #[must_use]
    pub fn success(output: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    /// Create a failed result
    #[must_use]
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }

    /// Payload handed back to the model: the output, or an error object
    #[must_use]
    pub fn into_payload(self) -> serde_json::Value {
        if self.success {
            self.output
        } else {
            error_payload(self.error.as_deref().unwrap_or("tool failed"))
        }
    }
}

/// Structured error object the model sees when a tool fails
#[must_use]
pub fn error_payload(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": true, "message": message })
}

/// Trait for tool implementations
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with given input
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult>;

    /// Validate input before execution
    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        if !input.is_object() {
            return Err(Error::InvalidInput("Input must be an object".to_string()));
        }
        Ok(())
    }
}

/// Registry for managing tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name.clone();
        debug!(tool = %name, category = tool.definition().category.as_str(), "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Get a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted
    #[must_use]
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Tools in a category, sorted by name
    #[must_use]
    pub fn by_category(&self, category: ToolCategory) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = self
            .tools
            .values()
            .filter(|t| t.definition().category == category)
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.definition().name.cmp(&b.definition().name));
        tools
    }

    /// Get tool count
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool {
        definition: ToolDefinition,
    }

    impl EchoTool {
        fn new(name: &str, category: ToolCategory) -> Self {
            Self {
                definition: ToolDefinition::new(name, "Echo input").with_category(category),
            }
        }
    }

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
            Ok(ToolResult::success(input, 0))
        }
    }

    #[test]
    fn test_tool_definition_builder() {
        let def = ToolDefinition::new("search_hotels", "Find hotels")
            .with_category(ToolCategory::Hotels)
            .with_parameters(serde_json::json!({"type": "object"}));

        assert_eq!(def.name, "search_hotels");
        assert_eq!(def.category, ToolCategory::Hotels);
        assert_eq!(def.to_llm().name, "search_hotels");
    }

    #[test]
    fn test_payload_for_failure() {
        let payload = ToolResult::failure("amadeus returned HTTP 500", 3).into_payload();
        assert_eq!(payload["error"], true);
        assert_eq!(payload["message"], "amadeus returned HTTP 500");

        let ok = ToolResult::success(serde_json::json!({"data": [1]}), 1).into_payload();
        assert_eq!(ok["data"][0], 1);
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("search_trains", ToolCategory::Rail)));
        registry.register(Arc::new(EchoTool::new("check_train_seats", ToolCategory::Rail)));
        registry.register(Arc::new(EchoTool::new("get_route", ToolCategory::Routes)));

        assert_eq!(registry.len(), 3);
        assert!(registry.has("get_route"));
        assert!(registry.get("missing").is_none());
        assert_eq!(
            registry.list_names(),
            vec!["check_train_seats", "get_route", "search_trains"]
        );

        let rail: Vec<String> = registry
            .by_category(ToolCategory::Rail)
            .iter()
            .map(|t| t.definition().name.clone())
            .collect();
        assert_eq!(rail, vec!["check_train_seats", "search_trains"]);
    }

    #[tokio::test]
    async fn test_default_validation_rejects_non_objects() {
        let tool = EchoTool::new("echo", ToolCategory::Agent);
        assert!(tool.validate_input(&serde_json::json!("text")).is_err());
        assert!(tool.validate_input(&serde_json::json!({})).is_ok());
        let result = tool.execute(serde_json::json!({"a": 1})).await.unwrap();
        assert!(result.success);
    }
}
