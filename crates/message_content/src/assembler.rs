use crate::decoder::{decode_next, DecodeOutcome};
use crate::sanitizer::TextSanitizer;
use crate::thinking::ThinkingExtractor;
use crate::widgets::Widget;
use crate::WidgetKind;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Whether more chunks are expected for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPhase {
    #[default]
    Streaming,
    Finalized,
}

/// One ordered unit of parsed message content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentSegment {
    Text { text: String },
    Chart { payload: Value },
    Risk { payload: Value },
    Timeline { payload: Value },
    Sentiment { payload: Value },
    Comparison { payload: Value },
}

impl ContentSegment {
    pub fn text(text: impl Into<String>) -> Self {
        ContentSegment::Text { text: text.into() }
    }

    pub fn widget(kind: WidgetKind, payload: Value) -> Self {
        match kind {
            WidgetKind::Chart => ContentSegment::Chart { payload },
            WidgetKind::Risk => ContentSegment::Risk { payload },
            WidgetKind::Timeline => ContentSegment::Timeline { payload },
            WidgetKind::Sentiment => ContentSegment::Sentiment { payload },
            WidgetKind::Comparison => ContentSegment::Comparison { payload },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentSegment::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn widget_kind(&self) -> Option<WidgetKind> {
        match self {
            ContentSegment::Text { .. } => None,
            ContentSegment::Chart { .. } => Some(WidgetKind::Chart),
            ContentSegment::Risk { .. } => Some(WidgetKind::Risk),
            ContentSegment::Timeline { .. } => Some(WidgetKind::Timeline),
            ContentSegment::Sentiment { .. } => Some(WidgetKind::Sentiment),
            ContentSegment::Comparison { .. } => Some(WidgetKind::Comparison),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            ContentSegment::Text { .. } => None,
            ContentSegment::Chart { payload }
            | ContentSegment::Risk { payload }
            | ContentSegment::Timeline { payload }
            | ContentSegment::Sentiment { payload }
            | ContentSegment::Comparison { payload } => Some(payload),
        }
    }

    /// Typed view of a widget segment; `None` for text
    pub fn to_widget(&self) -> Option<Result<Widget, crate::WidgetError>> {
        let kind = self.widget_kind()?;
        let payload = self.payload()?;
        Some(Widget::from_payload(kind, payload))
    }
}

/// The current render model of one message
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RenderModel {
    pub segments: Vec<ContentSegment>,
    pub thinking: Option<String>,
    /// The reasoning block has started but not yet closed
    pub thinking_open: bool,
}

impl RenderModel {
    pub fn widgets(&self) -> impl Iterator<Item = &ContentSegment> {
        self.segments.iter().filter(|s| s.widget_kind().is_some())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblerOptions {
    /// Drop widget payloads that do not match their typed shape
    pub strict_payloads: bool,
}

/// Turns a whole message buffer into ordered content segments.
///
/// The buffer is always parsed from the start: widget tags can straddle chunk
/// boundaries, so only a whole-buffer scan gives stable segment boundaries.
pub struct ContentAssembler {
    options: AssemblerOptions,
    thinking: ThinkingExtractor,
    sanitizer: TextSanitizer,
    partial_tag: Regex,
}

impl Default for ContentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-pass output and chart de-duplication scope
struct Pass {
    segments: Vec<ContentSegment>,
    seen_chart_keys: HashSet<String>,
}

impl ContentAssembler {
    pub fn new() -> Self {
        Self::with_options(AssemblerOptions::default())
    }

    pub fn with_options(options: AssemblerOptions) -> Self {
        Self {
            options,
            thinking: ThinkingExtractor::new(),
            sanitizer: TextSanitizer::new(),
            partial_tag: Regex::new(r"\[(?:CHART|RISK|TIMELINE|SENTIMENT|COMPARISON):?")
                .expect("valid partial tag pattern"),
        }
    }

    pub fn assemble(&self, buffer: &str, phase: StreamPhase) -> RenderModel {
        let extraction = self.thinking.extract(buffer);
        let content = extraction.visible.as_str();

        let mut pass = Pass {
            segments: Vec::new(),
            seen_chart_keys: HashSet::new(),
        };
        let mut cursor = 0;

        while cursor < content.len() {
            match decode_next(content, cursor) {
                DecodeOutcome::NoTag => {
                    let remaining = &content[cursor..];
                    let visible = match phase {
                        StreamPhase::Streaming => match self.partial_tag_start(remaining) {
                            Some(pos) => &remaining[..pos],
                            None => remaining,
                        },
                        StreamPhase::Finalized => remaining,
                    };
                    self.push_text(&mut pass, visible);
                    break;
                }
                DecodeOutcome::NoJsonBody { kind, tag_start } => {
                    self.push_text(&mut pass, &content[cursor..tag_start]);
                    debug!("{} tag without JSON body, skipping prefix", kind);
                    cursor = tag_start + kind.tag_prefix().len();
                }
                DecodeOutcome::Incomplete { kind, tag_start } => {
                    self.push_text(&mut pass, &content[cursor..tag_start]);
                    if phase == StreamPhase::Streaming {
                        // Wait for more data before showing anything past the tag
                        break;
                    }
                    debug!("Unclosed {} body in final message, dropping it", kind);
                    // The open body swallows text up to the next tag, if any
                    cursor = decode_next(content, tag_start + kind.tag_prefix().len())
                        .tag_start()
                        .unwrap_or(content.len());
                }
                DecodeOutcome::Unterminated {
                    kind,
                    tag_start,
                    json_end,
                } => {
                    self.push_text(&mut pass, &content[cursor..tag_start]);
                    if phase == StreamPhase::Streaming {
                        break;
                    }
                    debug!("Unterminated {} tag in final message, dropping it", kind);
                    cursor = unterminated_tag_end(content, json_end);
                }
                DecodeOutcome::Malformed { span, error } => {
                    self.push_text(&mut pass, &content[cursor..span.tag_start]);
                    warn!("Dropping malformed {} payload: {}", span.kind, error);
                    cursor = span.tag_end;
                }
                DecodeOutcome::Decoded { span, payload } => {
                    self.push_text(&mut pass, &content[cursor..span.tag_start]);
                    self.push_widget(&mut pass, span.kind, payload);
                    cursor = span.tag_end;
                }
            }
        }

        RenderModel {
            segments: pass.segments,
            thinking: extraction.thinking,
            thinking_open: extraction.open,
        }
    }

    fn push_text(&self, pass: &mut Pass, text: &str) {
        let cleaned = self.sanitizer.clean(text);
        if !cleaned.is_empty() {
            pass.segments.push(ContentSegment::Text { text: cleaned });
        }
    }

    fn push_widget(&self, pass: &mut Pass, kind: WidgetKind, payload: Value) {
        if self.options.strict_payloads {
            if let Err(e) = Widget::from_payload(kind, &payload) {
                warn!("Dropping {} payload that failed validation: {}", kind, e);
                return;
            }
        }

        if kind == WidgetKind::Chart {
            let key = chart_fingerprint(&payload);
            if !pass.seen_chart_keys.insert(key) {
                debug!("Skipping duplicate chart: {}", primary_dataset_label(&payload));
                return;
            }
        }

        pass.segments.push(ContentSegment::widget(kind, payload));
    }

    /// Offset of a tag that has started to arrive at the end of `text`
    fn partial_tag_start(&self, text: &str) -> Option<usize> {
        if let Some(m) = self.partial_tag.find(text) {
            return Some(m.start());
        }

        // A tail like "[", "[CH" or "[TIMEL" may become a tag prefix
        WidgetKind::ALL
            .iter()
            .flat_map(|kind| {
                let prefix = kind.tag_prefix();
                (1..prefix.len())
                    .filter(move |&len| text.ends_with(&prefix[..len]))
                    .map(move |len| text.len() - len)
            })
            .min()
    }
}

/// Where scanning resumes after an unterminated tag in a final message: past a
/// stray `]` on the same line, otherwise right after the body
fn unterminated_tag_end(content: &str, json_end: usize) -> usize {
    let rest = &content[json_end..];
    let line = rest.find('\n').map_or(rest, |n| &rest[..n]);
    line.find(']').map_or(json_end, |pos| json_end + pos + 1)
}

/// The chart body: the nested `data` object, or the payload itself for flat charts
fn chart_data(payload: &Value) -> &Value {
    payload
        .get("data")
        .filter(|data| data.is_object())
        .unwrap_or(payload)
}

fn primary_dataset_label(payload: &Value) -> &str {
    chart_data(payload)
        .pointer("/datasets/0/label")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// Dedup key for a chart: primary dataset label plus a truncated hash of its labels
fn chart_fingerprint(payload: &Value) -> String {
    let labels = chart_data(payload)
        .get("labels")
        .map(Value::to_string)
        .unwrap_or_else(|| "[]".to_string());
    let digest = format!("{:x}", md5::compute(labels.as_bytes()));
    format!("{}|{}", primary_dataset_label(payload), &digest[..16])
}
