//! Agent-backed engine

use super::agent::Agent;
use super::conversation::ConversationStore;
use super::runner::{AgentRunner, DEFAULT_MAX_TOOL_ROUNDS};
use super::tree::{build_agent_tree, AgentTree, CRITIQUE_FEEDBACK_KEY, GENERATED_RESPONSE_KEY};
use crate::engine::{ExecutionEngine, FragmentStream};
use crate::error::Result;
use crate::refinement::{
    ResponseCritic, ResponseGenerator, ResponseReviser, DEFAULT_COMPLETION_PHRASE,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use wayfarer_llm::{LlmProvider, Message};
use wayfarer_tools::ToolRegistry;

/// Agent engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentEngineConfig {
    /// Model name; empty means the provider default
    pub model: String,
    /// Sampling temperature for agents without their own
    pub temperature: Option<f32>,
    /// Output token limit per completion
    pub max_tokens: u32,
    /// Tool-call rounds per agent turn
    pub max_tool_rounds: usize,
    /// Phrase the critic is told to answer with when satisfied
    pub completion_phrase: String,
}

impl Default for AgentEngineConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: None,
            max_tokens: 8192,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            completion_phrase: DEFAULT_COMPLETION_PHRASE.to_string(),
        }
    }
}

struct EngineInner {
    runner: Arc<AgentRunner>,
    agents: AgentTree,
    conversations: ConversationStore,
}

/// Execution engine running the travel agent tree on an LLM provider
#[derive(Clone)]
pub struct AgentEngine {
    inner: Arc<EngineInner>,
}

impl AgentEngine {
    /// Build the agent tree over `provider` and the tools in `registry`
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: &ToolRegistry,
        config: AgentEngineConfig,
    ) -> Self {
        let runner = Arc::new(
            AgentRunner::new(provider)
                .with_model(config.model)
                .with_max_tokens(config.max_tokens)
                .with_max_tool_rounds(config.max_tool_rounds)
                .with_default_temperature(config.temperature),
        );
        let agents = build_agent_tree(&runner, registry, &config.completion_phrase);

        Self {
            inner: Arc::new(EngineInner {
                runner,
                agents,
                conversations: ConversationStore::new(),
            }),
        }
    }

    /// Conversation store
    #[must_use]
    pub fn conversations(&self) -> &ConversationStore {
        &self.inner.conversations
    }
}

impl EngineInner {
    /// Run `agent` inside a conversation and store its output under its key
    async fn run_agent(&self, agent: &Agent, conversation_id: &str, input: &str) -> Result<String> {
        let conversation = self.conversations.snapshot(conversation_id).await?;
        let text = self
            .runner
            .run(agent, &conversation.history, input, &conversation.state)
            .await?;
        if let Some(key) = &agent.output_key {
            self.conversations
                .set_state(conversation_id, key, text.as_str())
                .await?;
        }
        Ok(text)
    }

    async fn answer(&self, conversation_id: &str, message: &str) -> Result<String> {
        let text = self
            .run_agent(&self.agents.orchestrator, conversation_id, message)
            .await?;
        self.conversations
            .append(
                conversation_id,
                [Message::user(message), Message::assistant(text.as_str())],
            )
            .await?;
        Ok(text)
    }
}

#[async_trait::async_trait]
impl ExecutionEngine for AgentEngine {
    async fn create_conversation(&self, principal_id: &str) -> Result<String> {
        let id = self.inner.conversations.create(principal_id).await;
        debug!(principal_id, conversation_id = %id, "Conversation opened");
        Ok(id)
    }

    fn send_stream(
        &self,
        principal_id: &str,
        conversation_id: &str,
        message: &str,
    ) -> FragmentStream {
        let inner = self.inner.clone();
        let principal_id = principal_id.to_string();
        let conversation_id = conversation_id.to_string();
        let message = message.to_string();

        stream::once(async move {
            match inner
                .conversations
                .snapshot_owned(&principal_id, &conversation_id)
                .await
            {
                Ok(_) => inner.answer(&conversation_id, &message).await,
                Err(e) => Err(e),
            }
        })
        .boxed()
    }
}

#[async_trait::async_trait]
impl ResponseGenerator for AgentEngine {
    #[instrument(skip(self, query))]
    async fn generate(&self, query: &str, conversation_id: &str) -> Result<String> {
        self.inner.answer(conversation_id, query).await
    }
}

#[async_trait::async_trait]
impl ResponseCritic for AgentEngine {
    #[instrument(skip(self, query, response))]
    async fn critique(&self, conversation_id: &str, query: &str, response: &str) -> Result<String> {
        self.inner
            .conversations
            .set_state(conversation_id, GENERATED_RESPONSE_KEY, response)
            .await?;
        self.inner
            .run_agent(&self.inner.agents.critic, conversation_id, query)
            .await
    }
}

#[async_trait::async_trait]
impl ResponseReviser for AgentEngine {
    #[instrument(skip(self, query, response, points), fields(points = points.len()))]
    async fn revise(
        &self,
        conversation_id: &str,
        query: &str,
        response: &str,
        points: &[String],
    ) -> Result<String> {
        let conversations = &self.inner.conversations;
        let feedback = points
            .iter()
            .enumerate()
            .map(|(i, point)| format!("{}. {point}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        conversations
            .set_state(conversation_id, GENERATED_RESPONSE_KEY, response)
            .await?;
        conversations
            .set_state(conversation_id, CRITIQUE_FEEDBACK_KEY, feedback)
            .await?;

        let revised = self
            .inner
            .run_agent(&self.inner.agents.refiner, conversation_id, query)
            .await?;
        conversations
            .replace_last_assistant(conversation_id, &revised)
            .await?;
        info!(conversation_id, "Draft revised");
        Ok(revised)
    }
}

impl std::fmt::Debug for AgentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentEngine")
            .field("runner", &self.inner.runner)
            .finish()
    }
}
