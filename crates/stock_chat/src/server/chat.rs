use super::{AppState, ServerError};
use crate::config::USER_ID;
use crate::persistence::{ChatRecord, RecordRole};
use agent::{AgentChatRequest, ChatRequest, SseLineBuffer, StreamFrame};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use futures::StreamExt;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 32;

/// `POST /api/chat`
///
/// Relays the agent's event stream to the client byte for byte. The response
/// ends with `[DONE]` after a clean upstream end, or with a single error frame.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ServerError> {
    let request = request
        .into_agent_request()
        .map_err(|_| ServerError::bad_request("Message is required"))?;

    state
        .record(ChatRecord::new(USER_ID, RecordRole::User, &request.message))
        .await;

    let (tx, mut rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
    tokio::spawn(relay(state, request, tx));

    let body = futures::stream::poll_fn(move |cx| {
        rx.poll_recv(cx).map(|chunk| chunk.map(Ok::<_, Infallible>))
    });

    Response::builder()
        .header(CONTENT_TYPE, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .map_err(|e| ServerError::upstream("Failed to process chat", &e.into()))
}

/// How a relay ended
#[derive(Debug, PartialEq)]
enum RelayEnd {
    Completed,
    Failed(String),
    /// The agent sent its own error frame, which was relayed as is
    UpstreamError,
    Disconnected,
}

async fn relay(state: AppState, request: AgentChatRequest, tx: mpsc::Sender<Bytes>) {
    let deadline = Instant::now() + state.agent_timeout;
    let mut assistant_text = String::new();

    let end = tokio::select! {
        end = forward(&state, &request, &tx, &mut assistant_text) => end,
        _ = sleep_until(deadline) => {
            warn!("Agent did not finish within {:?}", state.agent_timeout);
            RelayEnd::Failed("Agent response timed out".to_string())
        }
        _ = tx.closed() => RelayEnd::Disconnected,
    };

    match end {
        RelayEnd::Completed => {
            let _ = tx.send(Bytes::from(StreamFrame::Done.to_sse())).await;
            if assistant_text.trim().is_empty() {
                debug!("Agent returned no content, nothing to persist");
            } else {
                state
                    .record(ChatRecord::new(USER_ID, RecordRole::Model, assistant_text))
                    .await;
            }
        }
        RelayEnd::Failed(error) => {
            let _ = tx.send(Bytes::from(StreamFrame::Error(error).to_sse())).await;
        }
        RelayEnd::UpstreamError => {}
        RelayEnd::Disconnected => {
            info!("Client disconnected, dropping agent stream");
        }
    }
}

async fn forward(
    state: &AppState,
    request: &AgentChatRequest,
    tx: &mpsc::Sender<Bytes>,
    assistant_text: &mut String,
) -> RelayEnd {
    let mut upstream = match state.agent.stream_chat(request).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to reach agent: {:#}", e);
            return RelayEnd::Failed("Failed to process chat".to_string());
        }
    };

    let mut lines = SseLineBuffer::new();
    let mut upstream_error = false;
    let mut inspect = |frame: StreamFrame| match frame {
        StreamFrame::Content(content) => assistant_text.push_str(&content),
        StreamFrame::Error(error) => {
            warn!("Agent reported an error: {}", error);
            upstream_error = true;
        }
        StreamFrame::Done => {}
    };

    while let Some(chunk) = upstream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Agent stream failed: {:#}", e);
                return RelayEnd::Failed("Stream error".to_string());
            }
        };
        lines.push_frames(&chunk).into_iter().for_each(&mut inspect);
        if tx.send(chunk).await.is_err() {
            return RelayEnd::Disconnected;
        }
    }
    if let Some(frame) = lines.finish_frame() {
        inspect(frame);
    }

    if upstream_error {
        return RelayEnd::UpstreamError;
    }
    RelayEnd::Completed
}
