use super::*;
use crate::mock::MockEngine;
use crate::refinement::DEFAULT_COMPLETION_PHRASE;
use crate::stream::STREAM_DONE_MARKER;

fn concierge(engine: &Arc<MockEngine>) -> Arc<Concierge> {
    Arc::new(Concierge::from_engine(engine.clone(), ConciergeConfig::default()).unwrap())
}

async fn collect(stream: ResponseStream) -> Vec<StreamEvent> {
    stream.collect().await
}

#[tokio::test]
async fn test_first_call_creates_and_refines() {
    let engine = Arc::new(MockEngine::new());
    engine.push_draft("Goa in 3 days");
    engine.push_critique("1. Add beaches");
    let concierge = concierge(&engine);

    let response = concierge
        .call(&ChatRequest::new("Plan a trip to Goa", "s1", "u1"))
        .await
        .unwrap();

    assert_eq!(response.session_id, "s1");
    assert_eq!(response.user_id, "u1");
    assert_eq!(response.response, "Goa in 3 days (revised)");
    assert_eq!(engine.creates(), 1);
    assert_eq!(engine.sends(), 1);
    assert_eq!(engine.generations(), 1);
    assert_eq!(engine.critiques(), 2);
    assert_eq!(engine.revisions(), 1);
}

#[tokio::test]
async fn test_second_call_reuses_session() {
    let engine = Arc::new(MockEngine::new());
    let concierge = concierge(&engine);
    let request = ChatRequest::new("Plan a trip to Goa", "s1", "u1");

    concierge.call(&request).await.unwrap();
    let second = concierge.call(&request).await.unwrap();

    assert_eq!(engine.creates(), 1);
    assert_eq!(second.session_id, "s1");
    // the internal id never leaks into the envelope
    let internal = concierge.sessions().get("u1", "s1").unwrap();
    assert_ne!(second.session_id, internal.internal_conversation_id);
}

#[tokio::test]
async fn test_engine_failure_is_returned() {
    let engine = Arc::new(MockEngine::new());
    engine.fail_generation(true);
    let concierge = concierge(&engine);

    let err = concierge
        .call(&ChatRequest::new("q", "s1", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Engine(_)));
    // the session itself was established
    assert!(concierge.sessions().get("u1", "s1").is_some());
}

#[test]
fn test_blocking_call() {
    let engine = Arc::new(MockEngine::new());
    let concierge = concierge(&engine);

    let response = concierge
        .call_blocking(&ChatRequest::new("Hi", "s9", "u9"))
        .unwrap();
    assert_eq!(response.response, "draft for: Hi");
    assert_eq!(response.session_id, "s9");
}

#[tokio::test]
async fn test_stream_yields_drafts_then_done() {
    let engine = Arc::new(MockEngine::new());
    engine.push_critique("- more detail");
    let events = collect(concierge(&engine).stream(ChatRequest::new("Goa", "s1", "u1"))).await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Fragment("draft for: Goa".to_string()),
            StreamEvent::Fragment("draft for: Goa (revised)".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_marker_text_is_still_a_fragment() {
    let engine = Arc::new(MockEngine::new());
    engine.push_draft(STREAM_DONE_MARKER);
    engine.push_critique(DEFAULT_COMPLETION_PHRASE);
    let events = collect(concierge(&engine).stream(ChatRequest::new("q", "s1", "u1"))).await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Fragment(STREAM_DONE_MARKER.to_string()),
            StreamEvent::Done,
        ]
    );
    assert!(!events[0].is_terminal());
}

#[tokio::test]
async fn test_stream_failure_ends_with_error() {
    let engine = Arc::new(MockEngine::new());
    engine.fail_create(true);
    let events = collect(concierge(&engine).stream(ChatRequest::new("q", "s1", "u1"))).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error(msg) if msg.contains("cannot create")));
}

#[tokio::test]
async fn test_stream_is_lazy() {
    let engine = Arc::new(MockEngine::new());
    let stream = concierge(&engine).stream(ChatRequest::new("q", "s1", "u1"));
    tokio::task::yield_now().await;
    assert_eq!(engine.creates(), 0);
    drop(stream);
}

#[test]
fn test_invalid_refinement_config_rejected() {
    let config = ConciergeConfig {
        refinement: RefinementConfig {
            completion_phrase: String::new(),
            ..RefinementConfig::default()
        },
        ..ConciergeConfig::default()
    };
    let result = Concierge::from_engine(Arc::new(MockEngine::new()), config);
    assert!(matches!(result, Err(Error::InvalidConfig { .. })));
}
