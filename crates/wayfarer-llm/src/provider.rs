//! Provider seam between agents and model backends

use crate::error::Result;
use crate::turn::{TurnReply, TurnRequest};

/// A chat model an agent can drive.
///
/// Implementations must be shareable across requests; the agent runner holds
/// one provider behind an `Arc` for the whole process.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Model used when a request leaves `model` empty
    fn default_model(&self) -> &str;

    /// Pick the requested model, or the default when none was named
    fn resolve_model<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.is_empty() {
            self.default_model()
        } else {
            requested
        }
    }

    /// Run one turn; the reply may ask for function calls
    async fn complete_turn(&self, request: TurnRequest) -> Result<TurnReply>;
}
