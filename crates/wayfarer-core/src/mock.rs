//! Scripted engine for tests and local runs
//!
//! [`MockEngine`] implements the engine seam and all three refinement stages
//! without a model behind them. Replies and critiques can be queued ahead of
//! time; every call is counted.

use crate::engine::{ExecutionEngine, FragmentStream};
use crate::error::{Error, Result};
use crate::refinement::{
    ResponseCritic, ResponseGenerator, ResponseReviser, DEFAULT_COMPLETION_PHRASE,
};
use futures::stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory engine with scripted answers
#[derive(Debug, Default)]
pub struct MockEngine {
    creates: AtomicUsize,
    sends: AtomicUsize,
    generations: AtomicUsize,
    critiques: AtomicUsize,
    revisions: AtomicUsize,
    drafts: Mutex<VecDeque<String>>,
    critiques_queue: Mutex<VecDeque<String>>,
    fail_create: AtomicBool,
    pending_create_failures: AtomicUsize,
    fail_send: AtomicBool,
    fail_generation: AtomicBool,
    create_delay: Option<Duration>,
}

impl MockEngine {
    /// Engine that accepts every first draft
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep inside `create_conversation`, widening race windows
    #[must_use]
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Queue the next generated draft
    pub fn push_draft(&self, draft: impl Into<String>) {
        lock(&self.drafts).push_back(draft.into());
    }

    /// Queue the next critic reply
    pub fn push_critique(&self, feedback: impl Into<String>) {
        lock(&self.critiques_queue).push_back(feedback.into());
    }

    /// Make conversation creation fail
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Fail only the next `count` conversation creations
    pub fn fail_next_creates(&self, count: usize) {
        self.pending_create_failures.store(count, Ordering::SeqCst);
    }

    /// Make plain sends (warm-up included) fail
    pub fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Make draft generation fail
    pub fn fail_generation(&self, fail: bool) {
        self.fail_generation.store(fail, Ordering::SeqCst);
    }

    /// Conversations created so far
    #[must_use]
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Plain sends so far
    #[must_use]
    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Drafts generated so far
    #[must_use]
    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }

    /// Critiques performed so far
    #[must_use]
    pub fn critiques(&self) -> usize {
        self.critiques.load(Ordering::SeqCst)
    }

    /// Revisions performed so far
    #[must_use]
    pub fn revisions(&self) -> usize {
        self.revisions.load(Ordering::SeqCst)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait::async_trait]
impl ExecutionEngine for MockEngine {
    async fn create_conversation(&self, principal_id: &str) -> Result<String> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        let scripted_failure = self
            .pending_create_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure || self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::Engine(format!(
                "cannot create conversation for {principal_id}"
            )));
        }
        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("conv-{n}"))
    }

    fn send_stream(
        &self,
        _principal_id: &str,
        conversation_id: &str,
        message: &str,
    ) -> FragmentStream {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let item = if self.fail_send.load(Ordering::SeqCst) {
            Err(Error::Engine(format!("{conversation_id} is unavailable")))
        } else {
            Ok(format!("ack: {message}"))
        };
        Box::pin(stream::iter([item]))
    }
}

#[async_trait::async_trait]
impl ResponseGenerator for MockEngine {
    async fn generate(&self, query: &str, _conversation_id: &str) -> Result<String> {
        self.generations.fetch_add(1, Ordering::SeqCst);
        if self.fail_generation.load(Ordering::SeqCst) {
            return Err(Error::Engine("generation failed".to_string()));
        }
        Ok(lock(&self.drafts)
            .pop_front()
            .unwrap_or_else(|| format!("draft for: {query}")))
    }
}

#[async_trait::async_trait]
impl ResponseCritic for MockEngine {
    async fn critique(
        &self,
        _conversation_id: &str,
        _query: &str,
        _response: &str,
    ) -> Result<String> {
        self.critiques.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.critiques_queue)
            .pop_front()
            .unwrap_or_else(|| DEFAULT_COMPLETION_PHRASE.to_string()))
    }
}

#[async_trait::async_trait]
impl ResponseReviser for MockEngine {
    async fn revise(
        &self,
        _conversation_id: &str,
        _query: &str,
        response: &str,
        _points: &[String],
    ) -> Result<String> {
        self.revisions.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{response} (revised)"))
    }
}
