use crate::protocol::{SseLineBuffer, StreamFrame};
use crate::types::{AgentChatRequest, ApiError};
use crate::utils::{check_response_error, network_error};
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, Url};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Raw byte stream of a streamed chat response
pub type ChatByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// HTTP client for the AI agent service
#[derive(Clone)]
pub struct AgentClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl AgentClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// The timeout bounds each whole request, including the streamed body
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid agent URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Agent URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a chat turn and return the agent's response body unmodified
    pub async fn stream_chat(&self, request: &AgentChatRequest) -> Result<ChatByteStream> {
        let url = self.endpoint(&["chat"])?;
        debug!("Sending chat request to {}", url);

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| network_error(e, self.timeout_secs))?;
        let response = check_response_error(response).await?;

        let timeout_secs = self.timeout_secs;
        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| anyhow::Error::from(network_error(e, timeout_secs))));
        Ok(Box::pin(stream))
    }

    /// Run a chat turn to completion, reporting each content delta.
    /// Returns the concatenated assistant text.
    pub async fn collect_chat<F>(&self, request: &AgentChatRequest, on_content: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let stream = self.stream_chat(request).await?;
        collect_stream(stream, on_content).await
    }

    pub async fn list_sessions(&self) -> Result<Value> {
        self.get_json(self.endpoint(&["sessions"])?).await
    }

    pub async fn create_session(&self) -> Result<Value> {
        let response = self
            .client
            .post(self.endpoint(&["sessions"])?)
            .send()
            .await
            .map_err(|e| network_error(e, self.timeout_secs))?;
        let response = check_response_error(response).await?;
        Ok(response.json().await?)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Value> {
        self.get_json(self.endpoint(&["sessions", session_id])?).await
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(e, self.timeout_secs))?;
        let response = check_response_error(response).await?;
        Ok(response.json().await?)
    }
}

/// Consume an event stream, calling `on_content` for every content frame.
///
/// Stops at the `[DONE]` sentinel or at the end of the stream. An error frame
/// aborts with `ApiError::Upstream`.
pub async fn collect_stream<S, F>(stream: S, mut on_content: F) -> Result<String>
where
    S: Stream<Item = Result<Bytes>>,
    F: FnMut(&str),
{
    let mut stream = std::pin::pin!(stream);
    let mut lines = SseLineBuffer::new();
    let mut text = String::new();

    let mut handle = |frame: StreamFrame, text: &mut String| -> Result<bool> {
        match frame {
            StreamFrame::Content(content) => {
                on_content(&content);
                text.push_str(&content);
                Ok(true)
            }
            StreamFrame::Done => Ok(false),
            StreamFrame::Error(error) => Err(ApiError::Upstream(error).into()),
        }
    };

    while let Some(chunk) = stream.next().await {
        for frame in lines.push_frames(&chunk?) {
            if !handle(frame, &mut text)? {
                return Ok(text);
            }
        }
    }
    if let Some(frame) = lines.finish_frame() {
        handle(frame, &mut text)?;
    }
    Ok(text)
}
