//! Streaming event types

use futures::stream::BoxStream;

/// Data payload of the terminal event on the wire
pub const STREAM_DONE_MARKER: &str = "[DONE]";

/// One item of a streamed chat response.
///
/// Fragments carry model text verbatim. Completion and failure are separate
/// variants, so a fragment whose text is `[DONE]` is still just text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of response text
    Fragment(String),
    /// The pipeline failed; no further events follow
    Error(String),
    /// The pipeline finished; no further events follow
    Done,
}

impl StreamEvent {
    /// Whether this event ends the stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Fragment(_))
    }
}

/// Finite, single-use stream of response events
pub type ResponseStream = BoxStream<'static, StreamEvent>;
