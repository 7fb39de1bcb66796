//! Error types for wayfarer-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// The conversational engine failed
    #[error("engine error: {0}")]
    Engine(String),

    /// Unknown conversation, or one owned by another principal
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// A refinement stage ran past its time limit
    #[error("{stage} stage timed out after {secs}s")]
    StageTimeout {
        /// Stage name
        stage: &'static str,
        /// Limit that was exceeded
        secs: u64,
    },

    /// The consumer went away before the pipeline finished
    #[error("request cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] wayfarer_llm::Error),

    /// Tool error
    #[error("tool error: {0}")]
    Tool(#[from] wayfarer_tools::Error),

    /// Internal error (runtime construction, poisoned state)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
