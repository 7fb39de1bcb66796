//! Wayfarer LLM - LLM Provider Abstraction
//!
//! This crate provides the model-facing layer of the Wayfarer concierge:
//! - Messages, turn requests/replies and function-calling types
//! - `LlmProvider`: the trait every backend implements
//! - Gemini: Google Gemini `generateContent` provider
//! - Mock: scripted provider for tests and offline runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod gemini;
pub mod message;
pub mod mock;
pub mod provider;
pub mod tools;
pub mod turn;
pub mod util;

pub use error::{Error, Result};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use provider::LlmProvider;
pub use tools::{ToolCall, ToolChoice, ToolDefinition};
pub use turn::{TurnReply, TurnRequest};
