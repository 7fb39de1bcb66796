//! Wayfarer Core - Conversation orchestration
//!
//! This crate turns a chat request into a refined answer:
//! - Engine: the seam to the conversational agent runtime
//! - Session mapping: client session ids to engine conversation ids
//! - Refinement: generate, critique and revise until accepted
//! - Facade: the blocking, async and streaming entry points
//! - Agents: the LLM-backed engine with its travel specialist tree

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agents;
pub mod engine;
pub mod error;
pub mod facade;
pub mod mock;
pub mod refinement;
pub mod session_mapper;
pub mod stream;

pub use agents::{AgentEngine, AgentEngineConfig};
pub use engine::{ExecutionEngine, FragmentStream};
pub use error::{Error, Result};
pub use facade::{ChatRequest, ChatResponse, Concierge, ConciergeConfig};
pub use mock::MockEngine;
pub use refinement::{
    Critique, LoopExit, RefinementConfig, RefinementLoop, RefinementOutcome, ResponseCritic,
    ResponseGenerator, ResponseReviser, DEFAULT_COMPLETION_PHRASE, DEFAULT_MAX_ITERATIONS,
};
pub use session_mapper::{SessionMapper, SessionMapping, WarmUpOutcome, DEFAULT_WARM_UP_MESSAGE};
pub use stream::{ResponseStream, StreamEvent, STREAM_DONE_MARKER};
