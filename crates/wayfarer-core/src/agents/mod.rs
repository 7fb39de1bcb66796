//! LLM-backed execution engine
//!
//! A tree of travel agents behind the [`ExecutionEngine`](crate::ExecutionEngine)
//! seam:
//!
//! ```text
//! travel_orchestrator ──┬── clarifying_agent
//!   (generate)          ├── inspiration_agent ──┬── places / routes tools
//!                       │                       └── weather_agent
//!                       └── planning_agent ─────┬── flight_agent
//!                                               ├── hotel_agent
//!                                               ├── train_agent
//!                                               ├── flight_seat_availability_agent
//!                                               └── routes / day trip tools
//! response_critic  (critique)
//! response_refiner (revise)
//! ```
//!
//! Sub-agents are exposed to their parents as tools. Conversations live in
//! memory for the lifetime of the process.

mod agent;
mod agent_tool;
mod conversation;
mod engine;
mod prompts;
mod runner;
mod tree;

pub use agent::Agent;
pub use agent_tool::AgentTool;
pub use conversation::{Conversation, ConversationStore};
pub use engine::{AgentEngine, AgentEngineConfig};
pub use runner::{AgentRunner, DEFAULT_MAX_TOOL_ROUNDS};
pub use tree::{build_agent_tree, AgentTree};
