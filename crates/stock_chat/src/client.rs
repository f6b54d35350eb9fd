//! Terminal client for the gateway

use crate::persistence::ChatRecord;
use crate::render::render_model;
use agent::{collect_stream, ChatRequest};
use anyhow::{Context, Result};
use futures::StreamExt;
use message_content::store::{generate_id, history_from_session, ChatAction, ChatStore, Role};
use reqwest::{Client, Response};
use serde_json::Value;
use std::io::Write;
use tracing::{debug, warn};

pub struct GatewayClient {
    http: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Send a chat message and stream the answer, reporting each content delta
    pub async fn send_message<F>(&self, request: &ChatRequest, on_content: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach gateway at {}", self.base_url))?;
        let response = check_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from));
        collect_stream(stream, on_content).await
    }

    pub async fn list_sessions(&self) -> Result<Value> {
        self.get_json("/api/sessions").await
    }

    pub async fn create_session(&self) -> Result<Value> {
        let response = self
            .http
            .post(format!("{}/api/sessions", self.base_url))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Value> {
        self.get_json(&format!("/api/sessions/{session_id}")).await
    }

    pub async fn history(&self) -> Result<Vec<ChatRecord>> {
        let response = self
            .http
            .get(format!("{}/api/history", self.base_url))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Turn a non-2xx gateway response into an error carrying its `error` field
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    anyhow::bail!("Gateway returned {}: {}", status.as_u16(), message)
}

/// Ask one question and print the rendered answer.
///
/// Returns the store so callers can inspect the final state. A failed request
/// leaves the error set and the placeholder removed.
pub async fn ask(
    client: &GatewayClient,
    request: ChatRequest,
    show_thinking: bool,
    out: &mut impl Write,
) -> Result<ChatStore> {
    let mut store = ChatStore::new();
    store.dispatch(ChatAction::SetSession(request.session_id.clone()))?;
    store.dispatch(ChatAction::AddUserMessage {
        id: generate_id("msg"),
        content: request.message.clone().unwrap_or_default(),
    })?;
    let assistant_id = generate_id("msg");
    store.dispatch(ChatAction::AddAssistantPlaceholder {
        id: assistant_id.clone(),
    })?;

    let result = client
        .send_message(&request, |chunk| {
            if let Err(e) = store.dispatch(ChatAction::AppendChunk {
                id: assistant_id.clone(),
                chunk: chunk.to_string(),
            }) {
                warn!("Dropping chunk: {}", e);
            }
        })
        .await;

    match result {
        Ok(text) => {
            debug!("Received {} bytes of assistant text", text.len());
            store.dispatch(ChatAction::Finalize {
                id: assistant_id.clone(),
                content: text,
            })?;
            if let Some(model) = store.render_model(&assistant_id) {
                writeln!(out, "{}", render_model(model, show_thinking))?;
            }
        }
        Err(e) => {
            store.dispatch(ChatAction::SetError(format!("{e:#}")))?;
            store.dispatch(ChatAction::RemoveMessage { id: assistant_id })?;
        }
    }
    Ok(store)
}

/// Print the messages of one agent session
pub async fn show_session(
    client: &GatewayClient,
    session_id: &str,
    show_thinking: bool,
    out: &mut impl Write,
) -> Result<()> {
    let session = client.get_session(session_id).await?;
    let mut store = ChatStore::new();
    store.dispatch(ChatAction::LoadHistory {
        session_id: session_id.to_string(),
        entries: history_from_session(&session),
    })?;

    if let Some(title) = session.get("title").and_then(Value::as_str) {
        writeln!(out, "# {title}\n")?;
    }
    for message in store.messages() {
        match message.role {
            Role::User => writeln!(out, "> {}\n", message.content)?,
            Role::Assistant => writeln!(out, "{}\n", render_model(&message.render, show_thinking))?,
        }
    }
    Ok(())
}

pub fn print_sessions(sessions: &Value, out: &mut impl Write) -> Result<()> {
    let Some(list) = sessions.as_array() else {
        writeln!(out, "{}", serde_json::to_string_pretty(sessions)?)?;
        return Ok(());
    };
    if list.is_empty() {
        writeln!(out, "No chat sessions found.")?;
        return Ok(());
    }
    for session in list {
        let id = session
            .get("id")
            .or_else(|| session.get("session_id"))
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .unwrap_or_else(|| "?".to_string());
        let title = session
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("(untitled)");
        writeln!(out, "  {id} - {title}")?;
    }
    Ok(())
}

pub fn print_history(records: &[ChatRecord], out: &mut impl Write) -> Result<()> {
    if records.is_empty() {
        writeln!(out, "No messages stored.")?;
    }
    for record in records {
        writeln!(
            out,
            "[{}] {:?}: {}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.role,
            record.content
        )?;
    }
    Ok(())
}
