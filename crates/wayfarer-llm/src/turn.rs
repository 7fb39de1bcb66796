//! One model turn
//!
//! A [`TurnRequest`] carries the conversation so far and the tools an agent
//! may call. The model answers with text, tool calls, or both.

use crate::message::{Message, MessageRole};
use crate::tools::{ToolCall, ToolChoice, ToolDefinition};

/// Input for one model turn
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// Model name; empty means the provider default
    pub model: String,
    /// System instruction, history and the new user message
    pub messages: Vec<Message>,
    /// Functions the model may call
    pub tools: Vec<ToolDefinition>,
    /// Whether the model may call them this turn
    pub tool_choice: ToolChoice,
    /// Output token limit
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl TurnRequest {
    /// Turn over `messages` with no tools
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Offer `tools` to the model
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Allow or forbid tool calls
    #[must_use]
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    /// Limit output tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature; `None` leaves the backend default
    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Text of the first system message, or `""`
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map_or("", |m| m.content.as_str())
    }

    /// Text of the latest user message, or `""`
    #[must_use]
    pub fn last_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map_or("", |m| m.content.as_str())
    }
}

/// What the model answered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReply {
    /// Text, if the model wrote any
    pub content: Option<String>,
    /// Functions the model wants called
    pub tool_calls: Vec<ToolCall>,
    /// Backend stop reason, for logs
    pub finish_reason: Option<String>,
}

impl TurnReply {
    /// Plain text answer
    #[must_use]
    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Reply that only requests tool calls
    #[must_use]
    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Default::default()
        }
    }

    /// Whether any tool call was requested
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
