//! Parsing of streamed assistant message content
//!
//! This crate implements:
//! - Extraction of the optional `<thinking>` block from a message buffer
//! - Decoding of inline widget tags (`[CHART: {...}]`, `[RISK: {...}]`, ...)
//! - Sanitizing of prose segments (tool-call leakage, SSE envelope remnants)
//! - The streaming content assembler that turns a whole buffer into ordered segments
//! - Typed widget payloads and a per-message chat state container

mod assembler;
mod decoder;
mod sanitizer;
mod thinking;
mod widgets;

pub mod store;

#[cfg(test)]
mod test_utils;

pub use assembler::{AssemblerOptions, ContentAssembler, ContentSegment, RenderModel, StreamPhase};
pub use decoder::{decode_next, DecodeOutcome, WidgetTagSpan};
pub use sanitizer::TextSanitizer;
pub use thinking::{ThinkingExtraction, ThinkingExtractor};
pub use widgets::{
    ChartData, ChartDataset, ChartPayload, ComparisonPayload, ComparisonRow, PriceTargets,
    RiskPayload, SentimentArticle, SentimentPayload, TimelineEvent, TimelinePayload, Widget,
    WidgetError,
};

use serde::{Deserialize, Serialize};

/// The inline widget kinds the agent can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Chart,
    Risk,
    Timeline,
    Sentiment,
    Comparison,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 5] = [
        WidgetKind::Chart,
        WidgetKind::Risk,
        WidgetKind::Timeline,
        WidgetKind::Sentiment,
        WidgetKind::Comparison,
    ];

    /// Upper-case tag name as it appears in the stream, e.g. `CHART`
    pub fn tag_name(self) -> &'static str {
        match self {
            WidgetKind::Chart => "CHART",
            WidgetKind::Risk => "RISK",
            WidgetKind::Timeline => "TIMELINE",
            WidgetKind::Sentiment => "SENTIMENT",
            WidgetKind::Comparison => "COMPARISON",
        }
    }

    /// Opening prefix of a tag, e.g. `[CHART:`
    pub fn tag_prefix(self) -> &'static str {
        match self {
            WidgetKind::Chart => "[CHART:",
            WidgetKind::Risk => "[RISK:",
            WidgetKind::Timeline => "[TIMELINE:",
            WidgetKind::Sentiment => "[SENTIMENT:",
            WidgetKind::Comparison => "[COMPARISON:",
        }
    }
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag_name())
    }
}
