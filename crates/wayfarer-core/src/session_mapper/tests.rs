use super::*;
use crate::mock::MockEngine;
use std::time::Duration;

fn mapper(engine: &Arc<MockEngine>) -> SessionMapper {
    SessionMapper::new(engine.clone())
}

#[tokio::test]
async fn test_same_session_reuses_conversation() {
    let engine = Arc::new(MockEngine::new());
    let sessions = mapper(&engine);

    let first = sessions.resolve_or_create("u1", "s1").await.unwrap();
    let second = sessions.resolve_or_create("u1", "s1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.creates(), 1);
    // one warm-up for the single creation
    assert_eq!(engine.sends(), 1);
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn test_principals_do_not_share_sessions() {
    let engine = Arc::new(MockEngine::new());
    let sessions = mapper(&engine);

    let alice = sessions.resolve_or_create("alice", "shared").await.unwrap();
    let bob = sessions.resolve_or_create("bob", "shared").await.unwrap();

    assert_ne!(alice, bob);
    assert_eq!(engine.creates(), 2);
    assert_eq!(
        sessions.get("bob", "shared").unwrap().internal_conversation_id,
        bob
    );
}

#[tokio::test]
async fn test_warm_up_failure_keeps_mapping() {
    let engine = Arc::new(MockEngine::new());
    engine.fail_send(true);
    let sessions = mapper(&engine);

    let conversation = sessions.resolve_or_create("u1", "s1").await.unwrap();
    let mapping = sessions.get("u1", "s1").unwrap();

    assert_eq!(mapping.internal_conversation_id, conversation);
    assert!(matches!(mapping.warm_up, WarmUpOutcome::Degraded(_)));

    // no second creation once degraded
    sessions.resolve_or_create("u1", "s1").await.unwrap();
    assert_eq!(engine.creates(), 1);
}

#[tokio::test]
async fn test_successful_warm_up_is_ready() {
    let engine = Arc::new(MockEngine::new());
    let sessions = mapper(&engine).with_warm_up_message("hello");

    sessions.resolve_or_create("u1", "s1").await.unwrap();
    assert_eq!(sessions.get("u1", "s1").unwrap().warm_up, WarmUpOutcome::Ready);
}

#[tokio::test]
async fn test_failed_creation_leaves_no_mapping() {
    let engine = Arc::new(MockEngine::new());
    engine.fail_create(true);
    let sessions = mapper(&engine);

    assert!(sessions.resolve_or_create("u1", "s1").await.is_err());
    assert!(sessions.get("u1", "s1").is_none());
    assert!(sessions.is_empty());

    engine.fail_create(false);
    let conversation = sessions.resolve_or_create("u1", "s1").await.unwrap();
    assert_eq!(conversation, "conv-1");
}

#[tokio::test]
async fn test_concurrent_first_requests_create_once() {
    let engine = Arc::new(MockEngine::new().with_create_delay(Duration::from_millis(50)));
    let sessions = Arc::new(mapper(&engine));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sessions = sessions.clone();
            tokio::spawn(async move { sessions.resolve_or_create("u1", "s1").await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(engine.creates(), 1);
    assert!(ids.iter().all(|id| id == &ids[0]));
}

#[tokio::test]
async fn test_waiter_retries_after_failed_creation() {
    let engine = Arc::new(MockEngine::new().with_create_delay(Duration::from_millis(30)));
    engine.fail_next_creates(1);
    let sessions = Arc::new(mapper(&engine));

    let first = {
        let sessions = sessions.clone();
        tokio::spawn(async move { sessions.resolve_or_create("u1", "s1").await })
    };
    // let the first caller start creating before the second one queues up
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = {
        let sessions = sessions.clone();
        tokio::spawn(async move { sessions.resolve_or_create("u1", "s1").await })
    };

    assert!(first.await.unwrap().is_err());
    let waiter = second.await.unwrap().unwrap();
    assert_eq!(waiter, "conv-1");
    assert_eq!(
        sessions.get("u1", "s1").unwrap().internal_conversation_id,
        waiter
    );

    let later = sessions.resolve_or_create("u1", "s1").await.unwrap();
    assert_eq!(later, waiter);
    assert_eq!(engine.creates(), 1);
    assert_eq!(sessions.len(), 1);
}

#[test]
fn test_warm_up_outcome_serialization() {
    let json = serde_json::to_value(WarmUpOutcome::Degraded("boom".to_string())).unwrap();
    assert_eq!(json, serde_json::json!({"status": "degraded", "error": "boom"}));
    let ready = serde_json::to_value(WarmUpOutcome::Ready).unwrap();
    assert_eq!(ready, serde_json::json!({"status": "ready"}));
}
