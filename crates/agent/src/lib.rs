//! Client side of the AI agent service
//!
//! This crate implements:
//! - The server-sent-events wire format used between agent, gateway and clients
//! - Byte-level line buffering for streamed responses
//! - Request types for the chat endpoint
//! - An HTTP client for streamed chat and the opaque session endpoints

#[cfg(test)]
mod tests;

mod client;
mod utils;

pub mod protocol;
pub mod types;

pub use client::{collect_stream, AgentClient, ChatByteStream};
pub use protocol::{SseLineBuffer, StreamFrame};
pub use types::*;
