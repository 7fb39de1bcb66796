//! Agent definition

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use wayfarer_tools::Tool;

static STATE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("STATE_PLACEHOLDER is a compile-time constant")
});

/// An LLM persona with its own instruction and tool set
#[derive(Clone)]
pub struct Agent {
    /// Unique name, also the tool name when exposed to a parent
    pub name: String,
    /// What the agent is for, shown to parents
    pub description: String,
    /// System instruction; `{key}` placeholders are filled from state
    pub instruction: String,
    /// Tools the agent may call
    pub tools: Vec<Arc<dyn Tool>>,
    /// State key that receives the agent's final text
    pub output_key: Option<String>,
    /// Sampling temperature override
    pub temperature: Option<f32>,
}

impl Agent {
    /// Agent without tools
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instruction: instruction.into(),
            tools: Vec::new(),
            output_key: None,
            temperature: None,
        }
    }

    /// Add tools
    #[must_use]
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Store the final text under `key`
    #[must_use]
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Look up one of this agent's tools by name
    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.definition().name == name)
    }

    /// Instruction with `{key}` replaced by state values.
    ///
    /// Keys missing from `state` become empty strings.
    #[must_use]
    pub fn render_instruction(&self, state: &HashMap<String, String>) -> String {
        STATE_PLACEHOLDER
            .replace_all(&self.instruction, |caps: &regex::Captures<'_>| {
                state.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tools: Vec<&str> = self
            .tools
            .iter()
            .map(|t| t.definition().name.as_str())
            .collect();
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &tools)
            .field("output_key", &self.output_key)
            .finish()
    }
}
