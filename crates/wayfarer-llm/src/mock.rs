//! Scripted LLM provider
//!
//! Replays queued replies in order and records every request it sees, so
//! agent tests can assert on the exact tool payloads fed back to the model.

use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use crate::turn::{TurnReply, TurnRequest};

use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock LLM provider that returns queued replies or a default echo.
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<TurnReply>>>,
    requests: Mutex<Vec<TurnRequest>>,
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn push_response(&self, reply: TurnReply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(reply));
    }

    /// Queue a plain text answer.
    pub fn push_text(&self, content: impl Into<String>) {
        self.push_response(TurnReply::answer(content));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: Error) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<TurnRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete_turn(&self, request: TurnRequest) -> Result<TurnReply> {
        let echo = format!("mock: {}", request.last_user_message());
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(TurnReply::answer(echo)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;

    #[tokio::test]
    async fn test_queue_then_default_echo() {
        let provider = MockProvider::new();
        provider.push_text("first");

        let request = TurnRequest::new("", vec![Message::user("hello")]);
        let first = provider.complete_turn(request.clone()).await.unwrap();
        assert_eq!(first.content.as_deref(), Some("first"));

        let second = provider.complete_turn(request).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("mock: hello"));
        assert_eq!(provider.requests().len(), 2);
    }

    #[test]
    fn test_queued_error() {
        let provider = MockProvider::new();
        provider.push_error(Error::RateLimit);
        let result = tokio_test::block_on(provider.complete_turn(TurnRequest::default()));
        assert!(matches!(result, Err(Error::RateLimit)));
    }

    #[test]
    fn test_resolve_model() {
        let provider = MockProvider::new();
        assert_eq!(provider.resolve_model(""), "mock-model");
        assert_eq!(provider.resolve_model("other"), "other");
    }
}
