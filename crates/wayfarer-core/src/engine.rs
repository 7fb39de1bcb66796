//! Engine seam
//!
//! The conversational runtime behind the concierge. Anything that can open
//! a conversation for a principal and answer messages in it can drive the
//! session mapper and the refinement loop.

use crate::error::Result;
use futures::stream::BoxStream;
use futures::TryStreamExt;

/// Fragments of one engine reply, in order
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Conversational runtime with per-principal conversations
#[async_trait::async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Open a new conversation owned by `principal_id` and return its id
    async fn create_conversation(&self, principal_id: &str) -> Result<String>;

    /// Send a message and stream the reply fragments
    fn send_stream(
        &self,
        principal_id: &str,
        conversation_id: &str,
        message: &str,
    ) -> FragmentStream;

    /// Send a message and collect every reply fragment
    async fn send(
        &self,
        principal_id: &str,
        conversation_id: &str,
        message: &str,
    ) -> Result<Vec<String>> {
        self.send_stream(principal_id, conversation_id, message)
            .try_collect()
            .await
    }
}
