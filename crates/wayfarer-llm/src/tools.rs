//! Tool types for LLM function calling

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tool definition for function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call requested by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as JSON string
    pub arguments: String,
}

impl ToolCall {
    /// Parse arguments as a typed value
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.arguments).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    /// Arguments as a JSON value, `{}` when the model sent nothing parseable
    #[must_use]
    pub fn arguments_value(&self) -> serde_json::Value {
        serde_json::from_str(&self.arguments).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// Whether the model may call the offered tools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide
    #[default]
    Auto,
    /// Answer in text only
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_parse_arguments() {
        let tool_call = ToolCall {
            id: "call_123".to_string(),
            name: "get_airport_code".to_string(),
            arguments: r#"{"query": "Goa"}"#.to_string(),
        };

        #[derive(Deserialize)]
        struct Args {
            query: String,
        }

        let args: Args = tool_call.parse_arguments().unwrap();
        assert_eq!(args.query, "Goa");
    }

    #[test]
    fn test_arguments_value_falls_back_to_empty_object() {
        let tool_call = ToolCall {
            id: "x".into(),
            name: "find_places".into(),
            arguments: "not json".into(),
        };
        assert_eq!(tool_call.arguments_value(), serde_json::json!({}));
    }

    #[test]
    fn test_tool_choice_default() {
        assert!(matches!(ToolChoice::default(), ToolChoice::Auto));
    }
}
