//! Chat state container.
//!
//! Owns the message list of one conversation view. All changes go through
//! [`ChatStore::dispatch`]; assistant messages re-parse their whole buffer on
//! every update and keep the resulting [`RenderModel`].

use crate::assembler::{ContentAssembler, RenderModel, StreamPhase};
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    /// Raw accumulated text; append-only while streaming
    pub content: String,
    pub phase: StreamPhase,
    pub timestamp: DateTime<Utc>,
    /// Parsed content, only maintained for assistant messages
    pub render: RenderModel,
}

impl ChatMessage {
    pub fn is_loading(&self) -> bool {
        self.role == Role::Assistant && self.phase == StreamPhase::Streaming
    }
}

/// A finalized message restored from a stored session
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone)]
pub enum ChatAction {
    AddUserMessage { id: String, content: String },
    AddAssistantPlaceholder { id: String },
    AppendChunk { id: String, chunk: String },
    Finalize { id: String, content: String },
    RemoveMessage { id: String },
    SetError(String),
    ClearError,
    /// Drop all messages and streaming state, keep the session id
    Clear,
    SetSession(Option<String>),
    LoadHistory {
        session_id: String,
        entries: Vec<HistoryEntry>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Unknown message id: {0}")]
    UnknownMessage(String),
    #[error("Message {0} is already finalized")]
    AlreadyFinalized(String),
    #[error("Message {0} is not an assistant message")]
    NotAssistant(String),
    #[error("Duplicate message id: {0}")]
    DuplicateId(String),
}

#[derive(Default)]
pub struct ChatStore {
    messages: Vec<ChatMessage>,
    streaming_id: Option<String>,
    error: Option<String>,
    session_id: Option<String>,
    assembler: ContentAssembler,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assembler(assembler: ContentAssembler) -> Self {
        Self {
            assembler,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn render_model(&self, id: &str) -> Option<&RenderModel> {
        self.message(id).map(|m| &m.render)
    }

    pub fn streaming_id(&self) -> Option<&str> {
        self.streaming_id.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming_id.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn dispatch(&mut self, action: ChatAction) -> Result<(), StoreError> {
        match action {
            ChatAction::AddUserMessage { id, content } => {
                self.ensure_new_id(&id)?;
                self.messages.push(ChatMessage {
                    id,
                    role: Role::User,
                    content,
                    phase: StreamPhase::Finalized,
                    timestamp: Utc::now(),
                    render: RenderModel::default(),
                });
            }
            ChatAction::AddAssistantPlaceholder { id } => {
                self.ensure_new_id(&id)?;
                self.messages.push(ChatMessage {
                    id: id.clone(),
                    role: Role::Assistant,
                    content: String::new(),
                    phase: StreamPhase::Streaming,
                    timestamp: Utc::now(),
                    render: RenderModel::default(),
                });
                self.streaming_id = Some(id);
                self.error = None;
            }
            ChatAction::AppendChunk { id, chunk } => {
                let message = streaming_message_mut(&mut self.messages, &id)?;
                message.content.push_str(&chunk);
                message.render = self.assembler.assemble(&message.content, message.phase);
                debug!(
                    "Message {} now has {} segments after {} bytes",
                    message.id,
                    message.render.segments.len(),
                    message.content.len()
                );
            }
            ChatAction::Finalize { id, content } => {
                let message = streaming_message_mut(&mut self.messages, &id)?;
                message.content = content;
                message.phase = StreamPhase::Finalized;
                message.render = self.assembler.assemble(&message.content, message.phase);
                if self.streaming_id.as_deref() == Some(id.as_str()) {
                    self.streaming_id = None;
                }
            }
            ChatAction::RemoveMessage { id } => {
                let before = self.messages.len();
                self.messages.retain(|m| m.id != id);
                if self.messages.len() == before {
                    return Err(StoreError::UnknownMessage(id));
                }
                if self.streaming_id.as_deref() == Some(id.as_str()) {
                    self.streaming_id = None;
                }
            }
            ChatAction::SetError(error) => self.error = Some(error),
            ChatAction::ClearError => self.error = None,
            ChatAction::Clear => {
                self.messages.clear();
                self.streaming_id = None;
                self.error = None;
            }
            ChatAction::SetSession(session_id) => self.session_id = session_id,
            ChatAction::LoadHistory {
                session_id,
                entries,
            } => {
                self.messages.clear();
                self.streaming_id = None;
                self.error = None;
                self.session_id = Some(session_id);
                for entry in entries {
                    let render = match entry.role {
                        Role::Assistant => self
                            .assembler
                            .assemble(&entry.content, StreamPhase::Finalized),
                        Role::User => RenderModel::default(),
                    };
                    self.messages.push(ChatMessage {
                        id: generate_id("hist"),
                        role: entry.role,
                        content: entry.content,
                        phase: StreamPhase::Finalized,
                        timestamp: Utc::now(),
                        render,
                    });
                }
            }
        }
        Ok(())
    }

    fn ensure_new_id(&self, id: &str) -> Result<(), StoreError> {
        if self.message(id).is_some() {
            return Err(StoreError::DuplicateId(id.to_string()));
        }
        Ok(())
    }
}

fn streaming_message_mut<'a>(
    messages: &'a mut [ChatMessage],
    id: &str,
) -> Result<&'a mut ChatMessage, StoreError> {
    let message = messages
        .iter_mut()
        .find(|m| m.id == id)
        .ok_or_else(|| StoreError::UnknownMessage(id.to_string()))?;
    if message.role != Role::Assistant {
        return Err(StoreError::NotAssistant(id.to_string()));
    }
    if message.phase == StreamPhase::Finalized {
        return Err(StoreError::AlreadyFinalized(id.to_string()));
    }
    Ok(message)
}

/// Map an agent session detail document to history entries.
///
/// Daily snapshot summaries come first, followed by the stored messages.
/// Messages without text parts are skipped.
pub fn history_from_session(session: &Value) -> Vec<HistoryEntry> {
    let snapshots = session
        .get("snapshots")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|snap| HistoryEntry {
            role: Role::Assistant,
            content: format!(
                "Daily summary ({}):\n{}",
                snap.get("date").and_then(Value::as_str).unwrap_or_default(),
                snap.get("summary").and_then(Value::as_str).unwrap_or_default()
            ),
        });

    let messages = session
        .get("messages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|msg| {
            let text = msg
                .get("parts")
                .and_then(|parts| parts.get(0))
                .and_then(|part| part.get("text"))
                .and_then(Value::as_str)?;
            let role = match msg.get("role").and_then(Value::as_str) {
                Some("model") => Role::Assistant,
                _ => Role::User,
            };
            Some(HistoryEntry {
                role,
                content: text.to_string(),
            })
        });

    snapshots.chain(messages).collect()
}

/// Message id of the form `<prefix>_<millis>_<random>`
pub fn generate_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), suffix)
}
