//! Browser chat endpoint — POST /chat
//!
//! Request:  `{"message": "hello", "mode": "neutral"}` (JSON, content-type not checked)
//! Response: `text/plain` stream, one `{"reply": "..."}` line per model chunk.
//! Empty message: a single `application/json` `{"reply": "Please enter a message."}`.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use hearth_agent::stream::ReplyChunk;
use hearth_core::types::Mode;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, warn};

use super::ApiError;
use crate::app::AppState;

pub const EMPTY_MESSAGE_REPLY: &str = "Please enter a message.";

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    Mode::Neutral.as_str().to_string()
}

/// POST /chat — classify the message, then stream the model reply.
pub async fn chat_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: ChatRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "POST /chat with unreadable body");
            return ApiError::bad_request(format!("invalid JSON body: {e}")).into_response();
        }
    };

    if req.message.trim().is_empty() {
        return Json(ReplyChunk::new(EMPTY_MESSAGE_REPLY)).into_response();
    }

    let mode = Mode::from_tag(&req.mode);
    info!(mode = %mode, chars = req.message.len(), "processing chat request");

    let prompt = state.prompt.build(&req.message, mode);
    let lines = state
        .relay
        .relay(prompt)
        .map(|chunk| Ok::<_, Infallible>(chunk.to_line()));

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(lines),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::*;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post_chat(body: &str) -> Request<Body> {
        Request::post("/chat")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn empty_message_never_reaches_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(config(dir.path(), &server.uri()));

        for body in [r#"{"message": "   ", "mode": "gf"}"#, r#"{}"#] {
            let resp = app.clone().oneshot(post_chat(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(
                resp.headers()[header::CONTENT_TYPE],
                "application/json"
            );
            assert_eq!(
                body_string(resp).await,
                r#"{"reply":"Please enter a message."}"#
            );
        }
    }

    #[tokio::test]
    async fn invalid_json_is_bad_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(config(dir.path(), "http://127.0.0.1:1"));

        let resp = app.oneshot(post_chat("not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(resp).await).expect("json");
        assert!(body["error"].as_str().unwrap().starts_with("invalid JSON body"));
    }

    #[tokio::test]
    async fn streams_reply_lines() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "{\"response\":\"Hel\"}\n{\"response\":\"lo\"}\n{\"done\":true}\n",
                "application/x-ndjson",
            ))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(config(dir.path(), &server.uri()));

        // no content-type header: body is parsed as JSON anyway
        let resp = app
            .oneshot(post_chat(r#"{"message": "hi", "mode": "funny"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(
            body_string(resp).await,
            "{\"reply\":\"Hel\"}\n{\"reply\":\"lo\"}\n"
        );

        let requests = server.received_requests().await.expect("recording on");
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json");
        let prompt = sent["prompt"].as_str().unwrap();
        assert!(prompt.starts_with("You are a humorous AI assistant"));
        assert!(prompt.ends_with("\n\nUser: hi\nAssistant:"));
    }

    #[tokio::test]
    async fn upstream_failure_is_an_inline_reply() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(config(dir.path(), "http://127.0.0.1:1"));

        let resp = app
            .oneshot(post_chat(r#"{"message": "hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_string(resp).await;
        assert_eq!(body.lines().count(), 1);
        let line: serde_json::Value = serde_json::from_str(body.trim_end()).expect("json");
        assert!(line["reply"]
            .as_str()
            .unwrap()
            .contains("Failed to connect to Ollama"));
    }
}
