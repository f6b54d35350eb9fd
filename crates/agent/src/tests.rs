use super::*;
use axum::extract::{Json, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

fn sse_response(chunks: Vec<Vec<u8>>) -> Response {
    let stream = stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<_, std::io::Error>(Bytes::from(chunk))),
    );
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .body(axum::body::Body::from_stream(stream))
        .unwrap()
}

/// Split a byte string at the given offsets
fn split_at(data: &[u8], offsets: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for &offset in offsets {
        chunks.push(data[start..offset].to_vec());
        start = offset;
    }
    chunks.push(data[start..].to_vec());
    chunks
}

async fn serve(app: Router) -> String {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", server_addr)
}

// Helper to create a mock agent that streams the given body and records the request
async fn create_mock_agent(body: Vec<Vec<u8>>) -> (String, Arc<Mutex<Option<Value>>>) {
    let received = Arc::new(Mutex::new(None));
    let recorder = received.clone();
    let app = Router::new().route(
        "/chat",
        post(move |Json(request): Json<Value>| {
            let body = body.clone();
            let recorder = recorder.clone();
            async move {
                *recorder.lock().unwrap() = Some(request);
                sse_response(body)
            }
        }),
    );
    (serve(app).await, received)
}

const STREAM_BODY: &str = concat!(
    "data: {\"content\": \"TCS trades at \"}\n\n",
    "data: {\"content\": \"₹4,120\"}\n\n",
    "data: {\"content\": \" [RISK:{\\\"score\\\":30}]\"}\n\n",
    "data: [DONE]\n\n",
);

#[tokio::test]
async fn test_collect_chat_across_fragmented_chunks() {
    let body = STREAM_BODY.as_bytes();
    // Cut inside a line and inside the multi-byte rupee sign
    let rupee = STREAM_BODY.find('₹').unwrap();
    let (base_url, received) = create_mock_agent(split_at(body, &[10, rupee + 1, rupee + 2])).await;

    let client = AgentClient::new(base_url).unwrap();
    let request = ChatRequest {
        message: Some("How is TCS?".into()),
        stock_symbol: Some("TCS".into()),
        mode: Some(AnalysisMode::Stock),
        ..ChatRequest::default()
    }
    .into_agent_request()
    .unwrap();

    let mut deltas = Vec::new();
    let text = client
        .collect_chat(&request, |delta| deltas.push(delta.to_string()))
        .await
        .unwrap();

    assert_eq!(text, "TCS trades at ₹4,120 [RISK:{\"score\":30}]");
    assert_eq!(deltas.len(), 3);
    assert_eq!(
        received.lock().unwrap().clone().unwrap(),
        json!({ "message": "How is TCS?", "stock_symbol": "TCS", "mode": "stock" })
    );
}

#[tokio::test]
async fn test_stream_chat_returns_bytes_unmodified() {
    let body = STREAM_BODY.as_bytes();
    let (base_url, _) = create_mock_agent(split_at(body, &[7, 50])).await;
    let client = AgentClient::new(base_url).unwrap();

    let mut stream = client
        .stream_chat(&ChatRequest::new("hi").into_agent_request().unwrap())
        .await
        .unwrap();
    let mut relayed = Vec::new();
    while let Some(chunk) = stream.next().await {
        relayed.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(relayed, body);
}

#[tokio::test]
async fn test_error_frame_aborts_collection() {
    let body = b"data: {\"content\": \"partial\"}\n\ndata: {\"error\": \"Stream error\"}\n\n".to_vec();
    let (base_url, _) = create_mock_agent(vec![body]).await;
    let client = AgentClient::new(base_url).unwrap();

    let mut deltas = Vec::new();
    let err = client
        .collect_chat(&ChatRequest::new("hi").into_agent_request().unwrap(), |d| {
            deltas.push(d.to_string())
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Upstream(message)) if message == "Stream error"
    ));
    assert_eq!(deltas, vec!["partial"]);
}

#[tokio::test]
async fn test_stream_without_done_keeps_tail() {
    let body = b"data: {\"content\": \"a\"}\n\ndata: {\"content\": \"b\"}".to_vec();
    let (base_url, _) = create_mock_agent(vec![body]).await;
    let client = AgentClient::new(base_url).unwrap();

    let text = client
        .collect_chat(&ChatRequest::new("hi").into_agent_request().unwrap(), |_| {})
        .await
        .unwrap();
    assert_eq!(text, "ab");
}

#[tokio::test]
async fn test_server_error_status() {
    let app = Router::new().route(
        "/chat",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "agent exploded").into_response() }),
    );
    let client = AgentClient::new(serve(app).await).unwrap();

    let err = client
        .stream_chat(&ChatRequest::new("hi").into_agent_request().unwrap())
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::ServiceError(text)) if text == "agent exploded"
    ));
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let app = Router::new().route(
        "/chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            sse_response(vec![b"data: [DONE]\n\n".to_vec()])
        }),
    );
    let client =
        AgentClient::with_timeout(serve(app).await, Duration::from_millis(200)).unwrap();

    let err = client
        .stream_chat(&ChatRequest::new("hi").into_agent_request().unwrap())
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_session_endpoints() {
    let app = Router::new()
        .route(
            "/sessions",
            get(|| async { Json(json!([{ "id": "s-1", "title": "TCS" }])) })
                .post(|| async { Json(json!({ "id": "s-2" })) }),
        )
        .route(
            "/sessions/:id",
            get(|Path(id): Path<String>| async move {
                if id == "s-1" {
                    Json(json!({ "id": id, "messages": [] })).into_response()
                } else {
                    (StatusCode::NOT_FOUND, "no such session").into_response()
                }
            }),
        );
    let client = AgentClient::new(format!("{}/", serve(app).await)).unwrap();

    assert_eq!(
        client.list_sessions().await.unwrap(),
        json!([{ "id": "s-1", "title": "TCS" }])
    );
    assert_eq!(client.create_session().await.unwrap(), json!({ "id": "s-2" }));
    assert_eq!(
        client.get_session("s-1").await.unwrap(),
        json!({ "id": "s-1", "messages": [] })
    );

    let err = client.get_session("missing").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::NotFound(_))
    ));
}
