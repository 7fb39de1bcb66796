//! Sub-agents as tools

use super::agent::Agent;
use super::runner::AgentRunner;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use wayfarer_tools::{Result, Tool, ToolCategory, ToolDefinition, ToolResult};

/// Exposes an [`Agent`] to a parent agent as a tool taking `{"request": ..}`
pub struct AgentTool {
    agent: Agent,
    runner: Arc<AgentRunner>,
    definition: ToolDefinition,
}

impl AgentTool {
    /// Wrap `agent`, running it on `runner`
    #[must_use]
    pub fn new(agent: Agent, runner: Arc<AgentRunner>) -> Self {
        let definition = ToolDefinition::new(&agent.name, &agent.description)
            .with_category(ToolCategory::Agent)
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "request": {
                        "type": "string",
                        "description": "What the agent should do, with every detail it needs"
                    }
                },
                "required": ["request"]
            }));
        Self {
            agent,
            runner,
            definition,
        }
    }

    /// Wrapped agent
    #[must_use]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

#[async_trait::async_trait]
impl Tool for AgentTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let request = input
            .get("request")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if request.trim().is_empty() {
            return Ok(ToolResult::failure(
                "Missing required parameter: request",
                0,
            ));
        }

        let elapsed = || start.elapsed().as_millis() as u64;
        match self
            .runner
            .run(&self.agent, &[], request, &HashMap::new())
            .await
        {
            Ok(text) => Ok(ToolResult::success(
                json!({ "agent": self.agent.name, "response": text }),
                elapsed(),
            )),
            Err(e) => Ok(ToolResult::failure(e.to_string(), elapsed())),
        }
    }
}
