//! Chat endpoints
//!
//! Streaming responses use SSE framing: every draft is a default `message`
//! event, completion is `event: done` with `data: [DONE]`, and a failure is
//! `event: error` with `data: Error: <message>`. A draft whose text happens
//! to be `[DONE]` therefore still arrives as a plain message event.

use super::AppState;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use tracing::{error, info};
use uuid::Uuid;
use wayfarer_core::{ChatRequest, StreamEvent, STREAM_DONE_MARKER};

const DEFAULT_USER_ID: &str = "user";
const SESSION_CREATED_MESSAGE: &str = "Session ID created. Will be initialized on first chat.";
const MISSING_QUERY: &str = "Missing required field 'query'";
const MISSING_SESSION: &str = "Missing required field 'session_id'. Call /getSession first.";

/// Body of `/chat` and `/chatStream`
#[derive(Debug, Default, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Body of `/getSession`
#[derive(Debug, Default, Deserialize)]
pub struct SessionBody {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Reply of `/getSession`
#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: String,
    pub user_id: String,
    pub app_name: String,
    pub message: &'static str,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Validate a chat body. Absent and unparsable bodies count as empty.
///
/// Only a missing (or null) `query`/`session_id` is rejected; an empty
/// string is passed through.
fn chat_request(body: Option<Json<ChatBody>>) -> Result<ChatRequest, Response> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let query = body.query.ok_or_else(|| bad_request(MISSING_QUERY))?;
    let session_id = body.session_id.ok_or_else(|| bad_request(MISSING_SESSION))?;
    let user_id = non_empty(body.user_id).unwrap_or_else(|| DEFAULT_USER_ID.to_string());
    Ok(ChatRequest::new(query, session_id, user_id))
}

async fn get_session(
    State(state): State<AppState>,
    body: Option<Json<SessionBody>>,
) -> impl IntoResponse {
    let user_id = body
        .and_then(|Json(b)| non_empty(b.user_id))
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let session_id = Uuid::new_v4().to_string();
    info!(session_id = %session_id, user_id = %user_id, "Session id issued");

    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            user_id,
            app_name: state.app_name.to_string(),
            message: SESSION_CREATED_MESSAGE,
        }),
    )
}

async fn chat(State(state): State<AppState>, body: Option<Json<ChatBody>>) -> Response {
    let request = match chat_request(body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };

    match state.concierge.call(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!(session_id = %request.client_session_id, error = %e, "Chat request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": e.to_string(),
                    "message": "Failed to process chat request",
                })),
            )
                .into_response()
        }
    }
}

async fn chat_stream(State(state): State<AppState>, body: Option<Json<ChatBody>>) -> Response {
    let request = match chat_request(body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };

    let events = state
        .concierge
        .clone()
        .stream(request)
        .map(|event| Ok::<_, Infallible>(to_sse(event)));

    let mut response = Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

/// `Event::data` rejects carriage returns; fold them into line feeds
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn to_sse(event: StreamEvent) -> Event {
    match event {
        StreamEvent::Fragment(text) => Event::default().data(normalize_newlines(&text)),
        StreamEvent::Error(message) => Event::default()
            .event("error")
            .data(format!("Error: {}", normalize_newlines(&message))),
        StreamEvent::Done => Event::default().event("done").data(STREAM_DONE_MARKER),
    }
}

/// Chat routes
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/getSession", post(get_session))
        .route("/chat", post(chat))
        .route("/chatStream", post(chat_stream))
}
