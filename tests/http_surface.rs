//! HTTP collaborators and the HTTP tool surface.
//!
//! Each test spins up an Axum stand-in for the remote chat backend or
//! retriever on a random port and drives the real reqwest clients against it.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tower::ServiceExt;

use convo_assist::backend::{BackgroundInvoker, ChatBackend, HttpChatBackend};
use convo_assist::channels::{HttpState, http_routes};
use convo_assist::config::RouterMode;
use convo_assist::error::{BackendError, RetrievalError};
use convo_assist::memory::{ConversationStore, HistorySummarizer, MessageRole};
use convo_assist::retrieval::{LiveRetriever, Retriever};
use convo_assist::tasks::TaskRegistry;
use convo_assist::tools::conversation_tools;
use convo_assist::turn::{TurnRouter, extract_task_id};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const API_KEY: &str = "test-key";

#[derive(Clone)]
struct FakeBackend {
    delay: Duration,
}

/// Stand-in chat backend: checks the API key, then echoes prompt and context.
async fn fake_chat(
    State(fake): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"detail": "bad key"})),
        );
    }
    tokio::time::sleep(fake.delay).await;
    let prompt = body["prompt"].as_str().unwrap_or_default();
    let context = body["context"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(serde_json::json!({"response": format!("answer to '{prompt}' [{context}]")})),
    )
}

async fn fake_failure() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "model crashed")
}

async fn fake_retrieve(Json(body): Json<Value>) -> impl IntoResponse {
    let history_len = body["history"].as_array().map_or(0, |h| h.len());
    Json(serde_json::json!({
        "documents": [
            {
                "content": format!("Result for {}", body["query"].as_str().unwrap_or_default()),
                "metadata": {"source": "search", "history_len": history_len}
            }
        ]
    }))
}

/// Start the stand-in services on a random port, return the base URL.
async fn start_server(delay: Duration) -> String {
    let app = Router::new()
        .route("/chat", post(fake_chat))
        .route("/broken", post(fake_failure))
        .route("/retrieve", post(fake_retrieve))
        .with_state(FakeBackend { delay });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

fn client(url: String, key: &str, timeout: Duration) -> HttpChatBackend {
    HttpChatBackend::new(url, SecretString::from(key.to_string()), timeout).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ── Chat backend client ──────────────────────────────────────────────

#[tokio::test]
async fn backend_sends_key_and_parses_response() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(Duration::ZERO).await;
        let backend = client(format!("{base}/chat"), API_KEY, Duration::from_secs(5));

        let reply = backend.chat("hello", "ctx").await.unwrap();
        assert_eq!(reply, "answer to 'hello' [ctx]");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn backend_errors_are_classified() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(Duration::ZERO).await;

        let wrong_key = client(format!("{base}/chat"), "nope", Duration::from_secs(5));
        let err = wrong_key.chat("hello", "").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 401, .. }));

        let broken = client(format!("{base}/broken"), API_KEY, Duration::from_secs(5));
        let err = broken.chat("hello", "").await.unwrap_err();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model crashed");
            }
            other => panic!("expected status error, got {other:?}"),
        }

        // Nothing listens on port 9 of localhost.
        let unreachable = client(
            "http://127.0.0.1:9/chat".to_string(),
            API_KEY,
            Duration::from_secs(5),
        );
        let err = unreachable.chat("hello", "").await.unwrap_err();
        assert!(matches!(err, BackendError::Connection(_)));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn backend_timeout_is_reported() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(Duration::from_secs(3)).await;
        let backend = client(format!("{base}/chat"), API_KEY, Duration::from_millis(200));

        let err = backend.chat("slow", "").await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)));
        assert!(err.to_string().contains("timed out"));
    })
    .await
    .expect("test timed out");
}

// ── Live retriever ───────────────────────────────────────────────────

#[tokio::test]
async fn live_retriever_round_trip() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(Duration::ZERO).await;
        let retriever = LiveRetriever::new(format!("{base}/retrieve")).unwrap();

        let store = ConversationStore::new();
        store.append("u1", MessageRole::User, "hello", None).await;
        let history = store.history("u1", 10).await;

        let docs = retriever.retrieve("belt slips", &history).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "Result for belt slips");
        assert_eq!(docs[0].metadata["history_len"], 1);

        let broken = LiveRetriever::new(format!("{base}/broken")).unwrap();
        let err = broken.retrieve("q", &[]).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Status { status: 500 }));
    })
    .await
    .expect("test timed out");
}

// ── Tool surface, deferred mode end to end ───────────────────────────

#[tokio::test]
async fn deferred_turn_over_http() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(Duration::from_millis(100)).await;
        let backend = client(format!("{base}/chat"), API_KEY, Duration::from_secs(5));
        let invoker = BackgroundInvoker::new(Arc::new(backend), Arc::new(TaskRegistry::new()));
        let store = Arc::new(ConversationStore::new());
        let router = Arc::new(TurnRouter::deferred(invoker, Arc::clone(&store)));

        let summarizer = Arc::new(HistorySummarizer::new(Arc::clone(&store), None));
        let tools = Arc::new(conversation_tools(router, summarizer).await);
        let app = http_routes(HttpState {
            tools,
            store,
            mode: RouterMode::Deferred,
        });

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/tools/process_conversation_turn",
                serde_json::json!({"user_id": "u1", "prompt": "torque spec?"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let carrier = body_json(response).await["output"]
            .as_str()
            .unwrap()
            .to_string();
        let task_id = extract_task_id(&carrier).unwrap();

        let status = |app: Router| {
            let task_id = task_id.clone();
            async move {
                let response = app
                    .oneshot(post_json(
                        "/api/tools/check_request_status",
                        serde_json::json!({"task_id": task_id}),
                    ))
                    .await
                    .unwrap();
                body_json(response).await["output"]
                    .as_str()
                    .unwrap()
                    .to_string()
            }
        };

        let mut answer = status(app.clone()).await;
        while answer.contains("still being processed") {
            tokio::time::sleep(Duration::from_millis(50)).await;
            answer = status(app.clone()).await;
        }
        assert_eq!(answer, "answer to 'torque spec?' []");

        let again = status(app.clone()).await;
        assert!(again.starts_with("Request not found"));

        // Both sides of the deferred turn land in the user's history.
        let response = app
            .oneshot(Request::get("/api/history/u1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let history = body_json(response).await;
        assert_eq!(history.as_array().unwrap().len(), 2);
        assert_eq!(history[0]["role"], "user");
        assert_eq!(history[0]["content"], "torque spec?");
        assert_eq!(history[1]["role"], "assistant");
        assert_eq!(history[1]["content"], "answer to 'torque spec?' []");
    })
    .await
    .expect("test timed out");
}
