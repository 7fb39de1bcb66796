//! Session mapping
//!
//! Maps `(principal, client session id)` to an engine conversation id. The
//! first request for a key creates the conversation and sends a warm-up
//! message; later requests reuse the id. Concurrent first requests for the
//! same key share one creation.

use crate::engine::ExecutionEngine;
use crate::error::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Message sent to a fresh conversation before the first real query
pub const DEFAULT_WARM_UP_MESSAGE: &str = "initialize";

/// Result of the warm-up exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum WarmUpOutcome {
    /// The engine answered the warm-up message
    Ready,
    /// Warm-up failed; the conversation is used anyway
    Degraded(String),
}

/// One established session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMapping {
    /// Caller identity
    pub principal_id: String,
    /// Session id chosen by the client
    pub client_session_id: String,
    /// Conversation id inside the engine
    pub internal_conversation_id: String,
    /// How warm-up went
    pub warm_up: WarmUpOutcome,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    principal_id: String,
    client_session_id: String,
}

impl SessionKey {
    fn new(principal_id: &str, client_session_id: &str) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            client_session_id: client_session_id.to_string(),
        }
    }
}

/// Lazily creates and remembers engine conversations per client session
pub struct SessionMapper {
    engine: Arc<dyn ExecutionEngine>,
    slots: DashMap<SessionKey, Arc<OnceCell<SessionMapping>>>,
    warm_up_message: String,
}

impl SessionMapper {
    /// Empty mapper over `engine`
    #[must_use]
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            engine,
            slots: DashMap::new(),
            warm_up_message: DEFAULT_WARM_UP_MESSAGE.to_string(),
        }
    }

    /// Override the warm-up message
    #[must_use]
    pub fn with_warm_up_message(mut self, message: impl Into<String>) -> Self {
        self.warm_up_message = message.into();
        self
    }

    /// Return the conversation id for this session, creating it on first use.
    ///
    /// A creation failure is returned to the caller and leaves no mapping;
    /// a concurrent waiter or the next request retries in the same slot. A warm-up failure is logged and recorded as
    /// [`WarmUpOutcome::Degraded`].
    #[instrument(skip(self))]
    pub async fn resolve_or_create(
        &self,
        principal_id: &str,
        client_session_id: &str,
    ) -> Result<String> {
        let key = SessionKey::new(principal_id, client_session_id);
        // clone the slot so no map guard is held across an await
        let slot = self.slots.entry(key).or_default().clone();
        if let Some(mapping) = slot.get() {
            debug!(conversation_id = %mapping.internal_conversation_id, "Session mapping hit");
            return Ok(mapping.internal_conversation_id.clone());
        }

        // a failed init leaves the cell empty and in place; a caller already
        // waiting on it (or the next request) retries the creation
        slot.get_or_try_init(|| self.establish(principal_id, client_session_id))
            .await
            .map(|mapping| mapping.internal_conversation_id.clone())
    }

    async fn establish(&self, principal_id: &str, client_session_id: &str) -> Result<SessionMapping> {
        let conversation_id = self.engine.create_conversation(principal_id).await?;
        info!(
            principal_id,
            client_session_id,
            conversation_id = %conversation_id,
            "Created engine conversation"
        );

        let warm_up = match self
            .engine
            .send(principal_id, &conversation_id, &self.warm_up_message)
            .await
        {
            Ok(_) => WarmUpOutcome::Ready,
            Err(e) => {
                warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "Warm-up failed, continuing with conversation"
                );
                WarmUpOutcome::Degraded(e.to_string())
            }
        };

        Ok(SessionMapping {
            principal_id: principal_id.to_string(),
            client_session_id: client_session_id.to_string(),
            internal_conversation_id: conversation_id,
            warm_up,
            created_at: Utc::now(),
        })
    }

    /// Established mapping for a session, if any
    #[must_use]
    pub fn get(&self, principal_id: &str, client_session_id: &str) -> Option<SessionMapping> {
        self.slots
            .get(&SessionKey::new(principal_id, client_session_id))
            .and_then(|slot| slot.get().cloned())
    }

    /// Number of established sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }

    /// Whether no session has been established
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SessionMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMapper")
            .field("sessions", &self.len())
            .field("warm_up_message", &self.warm_up_message)
            .finish()
    }
}

#[cfg(test)]
mod tests;
