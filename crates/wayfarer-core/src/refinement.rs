//! Response refinement
//!
//! A draft answer is critiqued and revised until the critic replies with the
//! completion phrase or the iteration budget runs out:
//!
//! ```text
//! GENERATE -> CRITIQUE -> (accepted) -> done
//!                  \-> REVISE -> CRITIQUE -> ...   (at most max_iterations rounds)
//! ```
//!
//! Acceptance is an exact string comparison with the completion phrase.
//! Critique text that merely contains the phrase still asks for a revision.

use crate::error::{Error, Result};
use crate::stream::StreamEvent;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

/// Critic output that accepts the current draft
pub const DEFAULT_COMPLETION_PHRASE: &str = "Response is adequate and ready for user.";

/// Critique/revise rounds before the latest draft is returned as is
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").expect("LIST_MARKER is a compile-time constant")
});

/// Parsed critic verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Critique {
    /// The critic returned exactly the completion phrase
    Accepted,
    /// Anything else; the actionable points found in the feedback
    NeedsRevision(Vec<String>),
}

impl Critique {
    /// Classify raw critic output
    #[must_use]
    pub fn parse(feedback: &str, completion_phrase: &str) -> Self {
        if feedback == completion_phrase {
            Self::Accepted
        } else {
            Self::NeedsRevision(revision_points(feedback))
        }
    }

    /// Whether the draft was accepted
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Split feedback into list items; unlisted feedback is a single point.
fn revision_points(feedback: &str) -> Vec<String> {
    let mut points: Vec<String> = Vec::new();
    let mut saw_marker = false;

    for line in feedback.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(found) = LIST_MARKER.find(line) {
            saw_marker = true;
            points.push(line[found.end()..].trim().to_string());
        } else if saw_marker {
            if let Some(last) = points.last_mut() {
                last.push(' ');
                last.push_str(line);
            }
        }
    }

    if !saw_marker {
        let whole = feedback.trim();
        if !whole.is_empty() {
            points.push(whole.to_string());
        }
    }
    points
}

/// Produces the first draft, one engine turn in the conversation
#[async_trait::async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Answer `query` inside conversation `conversation_id`
    async fn generate(&self, query: &str, conversation_id: &str) -> Result<String>;
}

/// Reviews a draft and returns either the completion phrase or feedback
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ResponseCritic: Send + Sync {
    /// Critique `response` to `query`
    async fn critique(&self, conversation_id: &str, query: &str, response: &str) -> Result<String>;
}

/// Rewrites a draft to address critique points
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ResponseReviser: Send + Sync {
    /// Revise `response` to `query` according to `points`
    async fn revise(
        &self,
        conversation_id: &str,
        query: &str,
        response: &str,
        points: &[String],
    ) -> Result<String>;
}

/// Refinement settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Critique/revise rounds
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Exact critic output that accepts a draft
    #[serde(default = "default_completion_phrase")]
    pub completion_phrase: String,
    /// Per-stage limit in seconds; 0 disables it
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_completion_phrase() -> String {
    DEFAULT_COMPLETION_PHRASE.to_string()
}

fn default_stage_timeout_secs() -> u64 {
    120
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            completion_phrase: default_completion_phrase(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

impl RefinementConfig {
    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.completion_phrase.trim().is_empty() {
            return Err(Error::InvalidConfig {
                field: "refinement.completion_phrase".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn stage_timeout(&self) -> Option<Duration> {
        (self.stage_timeout_secs > 0).then(|| Duration::from_secs(self.stage_timeout_secs))
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The critic accepted the draft
    Accepted,
    /// The iteration budget ran out
    BudgetExhausted,
}

/// Final state of one refinement run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementOutcome {
    /// The answer to return
    pub response: String,
    /// Critique rounds performed
    pub iterations: usize,
    /// Raw output of the last critique, if any ran
    pub critique_feedback: Option<String>,
    /// Why the loop stopped
    pub exit: LoopExit,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Generate,
    Critique,
    Revise,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Critique => "critique",
            Self::Revise => "revise",
        }
    }
}

/// Generate-critique-revise pipeline
#[derive(Clone)]
pub struct RefinementLoop {
    generator: Arc<dyn ResponseGenerator>,
    critic: Arc<dyn ResponseCritic>,
    reviser: Arc<dyn ResponseReviser>,
    config: RefinementConfig,
}

impl RefinementLoop {
    /// Assemble a loop from its three stages
    #[must_use]
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        critic: Arc<dyn ResponseCritic>,
        reviser: Arc<dyn ResponseReviser>,
    ) -> Self {
        Self {
            generator,
            critic,
            reviser,
            config: RefinementConfig::default(),
        }
    }

    /// Replace the settings
    #[must_use]
    pub fn with_config(mut self, config: RefinementConfig) -> Self {
        self.config = config;
        self
    }

    /// Current settings
    #[must_use]
    pub fn config(&self) -> &RefinementConfig {
        &self.config
    }

    /// Run the loop for one query.
    ///
    /// Each draft (the first answer and every revision) is sent to `drafts`
    /// as a [`StreamEvent::Fragment`] when a sink is given. A closed sink
    /// aborts the run with [`Error::Cancelled`].
    #[instrument(skip(self, query, drafts), fields(max_iterations = self.config.max_iterations))]
    pub async fn run(
        &self,
        query: &str,
        conversation_id: &str,
        drafts: Option<&mpsc::Sender<StreamEvent>>,
    ) -> Result<RefinementOutcome> {
        let mut response = self
            .bounded(Stage::Generate, self.generator.generate(query, conversation_id))
            .await?;
        emit(drafts, &response).await?;

        let mut iterations = 0;
        let mut critique_feedback = None;

        while iterations < self.config.max_iterations {
            let feedback = self
                .bounded(
                    Stage::Critique,
                    self.critic.critique(conversation_id, query, &response),
                )
                .await?;
            let verdict = Critique::parse(&feedback, &self.config.completion_phrase);
            critique_feedback = Some(feedback);
            iterations += 1;

            match verdict {
                Critique::Accepted => {
                    info!(iteration = iterations, "Response accepted by critic");
                    return Ok(RefinementOutcome {
                        response,
                        iterations,
                        critique_feedback,
                        exit: LoopExit::Accepted,
                    });
                }
                Critique::NeedsRevision(points) => {
                    info!(
                        iteration = iterations,
                        points = points.len(),
                        "Critic requested revision"
                    );
                    response = self
                        .bounded(
                            Stage::Revise,
                            self.reviser
                                .revise(conversation_id, query, &response, &points),
                        )
                        .await?;
                    emit(drafts, &response).await?;
                }
            }
        }

        info!(iterations, "Refinement budget exhausted, returning latest draft");
        Ok(RefinementOutcome {
            response,
            iterations,
            critique_feedback,
            exit: LoopExit::BudgetExhausted,
        })
    }

    async fn bounded<T, F>(&self, stage: Stage, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        debug!(stage = stage.as_str(), "Running refinement stage");
        match self.config.stage_timeout() {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| Error::StageTimeout {
                    stage: stage.as_str(),
                    secs: limit.as_secs(),
                })?,
            None => work.await,
        }
    }
}

async fn emit(drafts: Option<&mpsc::Sender<StreamEvent>>, text: &str) -> Result<()> {
    if let Some(tx) = drafts {
        tx.send(StreamEvent::Fragment(text.to_string()))
            .await
            .map_err(|_| Error::Cancelled)?;
    }
    Ok(())
}
