//! Agent turn execution
//!
//! One turn is a bounded tool-calling loop: the model either answers in text
//! or asks for tools, whose results are fed back as tool messages. Tool
//! failures are handed to the model as `{"error": true, "message": ..}` and
//! never abort the turn. After `max_tool_rounds` rounds of tool calls the
//! model is asked once more with tools disabled.

use super::agent::Agent;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use wayfarer_llm::{LlmProvider, Message, ToolCall, ToolChoice, TurnRequest};
use wayfarer_tools::error_payload;

/// Tool-call rounds per agent turn
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Runs agents against an LLM provider
pub struct AgentRunner {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tool_rounds: usize,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl AgentRunner {
    /// Runner using the provider's default model
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: String::new(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    /// Use a specific model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Limit tool-call rounds per turn
    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Limit output tokens per model turn
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Temperature for agents that do not set their own
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Run one turn of `agent` on `input` and return its final text
    #[instrument(skip_all, fields(agent = %agent.name))]
    pub async fn run(
        &self,
        agent: &Agent,
        history: &[Message],
        input: &str,
        state: &HashMap<String, String>,
    ) -> Result<String> {
        let model = self.provider.resolve_model(&self.model).to_string();
        let definitions: Vec<_> = agent
            .tools
            .iter()
            .map(|t| t.definition().to_llm())
            .collect();

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(agent.render_instruction(state)));
        messages.extend_from_slice(history);
        messages.push(Message::user(input));

        let mut round = 0;
        loop {
            let last_round = round >= self.max_tool_rounds;
            let choice = if last_round {
                ToolChoice::None
            } else {
                ToolChoice::Auto
            };
            let request = TurnRequest::new(&model, messages.clone())
                .with_tools(definitions.clone())
                .with_tool_choice(choice)
                .with_max_tokens(self.max_tokens)
                .with_temperature(agent.temperature.or(self.temperature));

            let response = self.provider.complete_turn(request).await?;

            if !response.has_tool_calls() || last_round {
                if response.has_tool_calls() {
                    warn!(rounds = round, "Tool round limit reached, ignoring further calls");
                }
                debug!(rounds = round, "Agent turn finished");
                return Ok(response.content.unwrap_or_default());
            }

            messages.push(Message::assistant_with_tool_calls(
                response.content.unwrap_or_default(),
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let payload = self.call_tool(agent, call).await;
                messages.push(Message::tool_response(&call.id, &call.name, payload.to_string()));
            }
            round += 1;
        }
    }

    async fn call_tool(&self, agent: &Agent, call: &ToolCall) -> serde_json::Value {
        let Some(tool) = agent.tool(&call.name) else {
            warn!(tool = %call.name, "Model asked for an unknown tool");
            return error_payload(&format!("unknown tool: {}", call.name));
        };

        let input = call.arguments_value();
        if let Err(e) = tool.validate_input(&input) {
            return error_payload(&e.to_string());
        }

        let start = Instant::now();
        match tool.execute(input).await {
            Ok(result) => {
                info!(
                    tool = %call.name,
                    success = result.success,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool executed"
                );
                result.into_payload()
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool failed");
                error_payload(&e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}
