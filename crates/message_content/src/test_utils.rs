//! Shared helpers for the assembler and store tests

use crate::{ContentSegment, RenderModel};
use serde_json::Value;

/// Split text into chunks of `chunk_size` characters, like a fragmenting transport would
pub fn chunk_str(s: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect()
}

/// All prefixes of `s` that end on a character boundary, shortest first
pub fn char_prefixes(s: &str) -> Vec<&str> {
    s.char_indices()
        .map(|(i, _)| &s[..i])
        .chain(std::iter::once(s))
        .collect()
}

pub fn widget_payloads(model: &RenderModel) -> Vec<Value> {
    model
        .widgets()
        .filter_map(|s| s.payload().cloned())
        .collect()
}

pub fn texts(model: &RenderModel) -> Vec<&str> {
    model
        .segments
        .iter()
        .filter_map(ContentSegment::as_text)
        .collect()
}
