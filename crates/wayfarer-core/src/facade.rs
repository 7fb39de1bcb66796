//! Invocation facade
//!
//! [`Concierge`] answers one chat query: resolve the client session to an
//! engine conversation, run the refinement loop, and wrap the result. The
//! same pipeline backs three delivery modes:
//!
//! - [`Concierge::call`] for callers already on a tokio runtime
//! - [`Concierge::call_blocking`] for plain threads
//! - [`Concierge::stream`] for incremental delivery as [`StreamEvent`]s

use crate::engine::ExecutionEngine;
use crate::error::{Error, Result};
use crate::refinement::{
    RefinementConfig, RefinementLoop, ResponseCritic, ResponseGenerator, ResponseReviser,
};
use crate::session_mapper::{SessionMapper, DEFAULT_WARM_UP_MESSAGE};
use crate::stream::{ResponseStream, StreamEvent};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, instrument, warn};

const STREAM_BUFFER: usize = 16;

/// One user query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question
    pub query: String,
    /// Session id chosen by the client
    pub client_session_id: String,
    /// Caller identity
    pub principal_id: String,
}

impl ChatRequest {
    /// Build a request
    pub fn new(
        query: impl Into<String>,
        client_session_id: impl Into<String>,
        principal_id: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            client_session_id: client_session_id.into(),
            principal_id: principal_id.into(),
        }
    }
}

/// Refined answer, echoing the client's own identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Final response text
    pub response: String,
    /// The client session id from the request
    pub session_id: String,
    /// The principal id from the request
    pub user_id: String,
}

/// Facade settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConciergeConfig {
    /// Refinement loop settings
    #[serde(default)]
    pub refinement: RefinementConfig,
    /// First message sent to every new conversation
    #[serde(default = "default_warm_up_message")]
    pub warm_up_message: String,
}

fn default_warm_up_message() -> String {
    DEFAULT_WARM_UP_MESSAGE.to_string()
}

impl Default for ConciergeConfig {
    fn default() -> Self {
        Self {
            refinement: RefinementConfig::default(),
            warm_up_message: default_warm_up_message(),
        }
    }
}

/// Session mapping plus refinement, behind one entry point
pub struct Concierge {
    sessions: SessionMapper,
    refinement: RefinementLoop,
}

impl Concierge {
    /// Combine a session mapper and a refinement loop
    #[must_use]
    pub fn new(sessions: SessionMapper, refinement: RefinementLoop) -> Self {
        Self {
            sessions,
            refinement,
        }
    }

    /// Wire every role to a single engine
    pub fn from_engine<E>(engine: Arc<E>, config: ConciergeConfig) -> Result<Self>
    where
        E: ExecutionEngine + ResponseGenerator + ResponseCritic + ResponseReviser + 'static,
    {
        config.refinement.validate()?;
        let sessions =
            SessionMapper::new(engine.clone()).with_warm_up_message(config.warm_up_message);
        let refinement = RefinementLoop::new(engine.clone(), engine.clone(), engine)
            .with_config(config.refinement);
        Ok(Self::new(sessions, refinement))
    }

    /// Session table
    #[must_use]
    pub fn sessions(&self) -> &SessionMapper {
        &self.sessions
    }

    /// Answer a query and wait for the refined response
    #[instrument(skip(self, request), fields(session_id = %request.client_session_id, user_id = %request.principal_id))]
    pub async fn call(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self.answer(request, None).await?;
        Ok(ChatResponse {
            response,
            session_id: request.client_session_id.clone(),
            user_id: request.principal_id.clone(),
        })
    }

    /// Blocking form of [`Concierge::call`].
    ///
    /// Drives the pipeline on a fresh current-thread runtime that is dropped
    /// afterwards. Must not be called from inside an async context.
    pub fn call_blocking(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Internal(format!("failed to build runtime: {e}")))?;
        runtime.block_on(self.call(request))
    }

    /// Stream the answer.
    ///
    /// Every draft is yielded as a [`StreamEvent::Fragment`]; the last one
    /// is the refined response. The stream ends with [`StreamEvent::Done`]
    /// on success or a single [`StreamEvent::Error`] on failure. Nothing
    /// runs until the stream is first polled, and dropping it stops the
    /// pipeline at the next draft.
    pub fn stream(self: Arc<Self>, request: ChatRequest) -> ResponseStream {
        stream::once(async move {
            let (tx, rx) = mpsc::channel(STREAM_BUFFER);
            tokio::spawn(self.drive(request, tx));
            ReceiverStream::new(rx)
        })
        .flatten()
        .boxed()
    }

    async fn drive(self: Arc<Self>, request: ChatRequest, tx: mpsc::Sender<StreamEvent>) {
        match self.answer(&request, Some(&tx)).await {
            Ok(_) => {
                let _ = tx.send(StreamEvent::Done).await;
            }
            Err(Error::Cancelled) => {
                debug!(session_id = %request.client_session_id, "Stream consumer went away");
            }
            Err(e) => {
                warn!(session_id = %request.client_session_id, error = %e, "Streaming chat failed");
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
            }
        }
    }

    async fn answer(
        &self,
        request: &ChatRequest,
        drafts: Option<&mpsc::Sender<StreamEvent>>,
    ) -> Result<String> {
        let conversation_id = self
            .sessions
            .resolve_or_create(&request.principal_id, &request.client_session_id)
            .await?;

        let outcome = self
            .refinement
            .run(&request.query, &conversation_id, drafts)
            .await?;
        info!(
            conversation_id = %conversation_id,
            iterations = outcome.iterations,
            exit = ?outcome.exit,
            "Chat answered"
        );
        Ok(outcome.response)
    }
}

impl std::fmt::Debug for Concierge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Concierge")
            .field("sessions", &self.sessions)
            .field("refinement", self.refinement.config())
            .finish()
    }
}

#[cfg(test)]
mod tests;
