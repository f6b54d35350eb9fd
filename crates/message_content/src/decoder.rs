use crate::WidgetKind;
use serde_json::Value;

/// Byte offsets of one recognized widget tag within a buffer.
///
/// `json_start..json_end` is the brace-balanced body, `tag_end` is one past the
/// closing `]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetTagSpan {
    pub kind: WidgetKind,
    pub tag_start: usize,
    pub json_start: usize,
    pub json_end: usize,
    pub tag_end: usize,
}

/// Result of looking for the next widget tag from a cursor position
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// No recognized tag prefix at or after the cursor
    NoTag,
    /// A prefix was found but the next non-whitespace character is not `{`
    NoJsonBody { kind: WidgetKind, tag_start: usize },
    /// The JSON body is still open at the end of the buffer
    Incomplete { kind: WidgetKind, tag_start: usize },
    /// The JSON body is closed but is not followed by `]`
    Unterminated {
        kind: WidgetKind,
        tag_start: usize,
        json_end: usize,
    },
    /// The tag is complete but its body is not valid JSON
    Malformed { span: WidgetTagSpan, error: String },
    /// The tag is complete and its body parsed
    Decoded { span: WidgetTagSpan, payload: Value },
}

impl DecodeOutcome {
    /// Start offset of the tag this outcome refers to, if any
    pub fn tag_start(&self) -> Option<usize> {
        match self {
            DecodeOutcome::NoTag => None,
            DecodeOutcome::NoJsonBody { tag_start, .. }
            | DecodeOutcome::Incomplete { tag_start, .. }
            | DecodeOutcome::Unterminated { tag_start, .. } => Some(*tag_start),
            DecodeOutcome::Malformed { span, .. } | DecodeOutcome::Decoded { span, .. } => {
                Some(span.tag_start)
            }
        }
    }
}

/// Locate and decode the next widget tag at or after `cursor`.
///
/// Never mutates the buffer. Calling again with a longer buffer and the same
/// cursor yields the same outcome for tags that were already complete.
pub fn decode_next(buffer: &str, cursor: usize) -> DecodeOutcome {
    let Some((kind, tag_start)) = find_next_prefix(buffer, cursor) else {
        return DecodeOutcome::NoTag;
    };

    let bytes = buffer.as_bytes();
    let body_search = tag_start + kind.tag_prefix().len();

    let Some(json_start) = skip_whitespace(bytes, body_search) else {
        // Only whitespace after the prefix so far
        return DecodeOutcome::Incomplete { kind, tag_start };
    };
    if bytes[json_start] != b'{' {
        return DecodeOutcome::NoJsonBody { kind, tag_start };
    }

    let Some(json_end) = find_body_end(bytes, json_start) else {
        return DecodeOutcome::Incomplete { kind, tag_start };
    };

    let tag_end = match skip_whitespace(bytes, json_end) {
        Some(pos) if bytes[pos] == b']' => pos + 1,
        _ => {
            return DecodeOutcome::Unterminated {
                kind,
                tag_start,
                json_end,
            }
        }
    };

    let span = WidgetTagSpan {
        kind,
        tag_start,
        json_start,
        json_end,
        tag_end,
    };

    match serde_json::from_str::<Value>(&buffer[json_start..json_end]) {
        Ok(payload) => DecodeOutcome::Decoded { span, payload },
        Err(e) => DecodeOutcome::Malformed {
            span,
            error: e.to_string(),
        },
    }
}

/// Earliest occurrence of any widget tag prefix at or after `cursor`
fn find_next_prefix(buffer: &str, cursor: usize) -> Option<(WidgetKind, usize)> {
    let haystack = buffer.get(cursor..)?;
    WidgetKind::ALL
        .iter()
        .filter_map(|kind| {
            haystack
                .find(kind.tag_prefix())
                .map(|offset| (*kind, cursor + offset))
        })
        .min_by_key(|(_, pos)| *pos)
}

fn skip_whitespace(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len()).find(|&i| !bytes[i].is_ascii_whitespace())
}

/// Position one past the brace that closes the body opened at `json_start`.
///
/// Only brace depth is tracked. A body whose braces balance but whose JSON does
/// not parse is left for `serde_json` to reject as malformed.
fn find_body_end(bytes: &[u8], json_start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(json_start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_tag() {
        assert_eq!(decode_next("plain text only", 0), DecodeOutcome::NoTag);
        assert_eq!(decode_next("", 0), DecodeOutcome::NoTag);
    }

    #[test]
    fn test_decodes_complete_tag() {
        let buffer = r#"intro [RISK: {"ticker":"TCS","score":30}] outro"#;
        match decode_next(buffer, 0) {
            DecodeOutcome::Decoded { span, payload } => {
                assert_eq!(span.kind, WidgetKind::Risk);
                assert_eq!(span.tag_start, 6);
                assert_eq!(&buffer[span.json_start..span.json_end], r#"{"ticker":"TCS","score":30}"#);
                assert_eq!(&buffer[span.tag_end..], " outro");
                assert_eq!(payload, json!({"ticker": "TCS", "score": 30}));
            }
            other => panic!("Expected decoded tag, got {other:?}"),
        }
    }

    #[test]
    fn test_picks_earliest_prefix() {
        let buffer = r#"[TIMELINE:{"a":1}] [CHART:{"b":2}]"#;
        match decode_next(buffer, 0) {
            DecodeOutcome::Decoded { span, .. } => assert_eq!(span.kind, WidgetKind::Timeline),
            other => panic!("Expected timeline, got {other:?}"),
        }
        match decode_next(buffer, 1) {
            DecodeOutcome::Decoded { span, .. } => assert_eq!(span.kind, WidgetKind::Chart),
            other => panic!("Expected chart, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_braces_and_balanced_braces_in_strings() {
        let buffer = r#"[CHART:{"title":"Q{1}","data":{"labels":["a"],"datasets":[{"label":"x"}]}}]"#;
        match decode_next(buffer, 0) {
            DecodeOutcome::Decoded { span, payload } => {
                assert_eq!(span.tag_end, buffer.len());
                assert_eq!(payload["title"], "Q{1}");
            }
            other => panic!("Expected decoded chart, got {other:?}"),
        }
    }

    #[test]
    fn test_unbalanced_quote_with_balanced_braces_is_malformed() {
        let buffer = r#"[CHART:{"a:1}] B text"#;
        match decode_next(buffer, 0) {
            DecodeOutcome::Malformed { span, .. } => {
                assert_eq!(&buffer[span.json_start..span.json_end], r#"{"a:1}"#);
                assert_eq!(&buffer[span.tag_end..], " B text");
            }
            other => panic!("Expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_lone_brace_inside_string_closes_body_early() {
        let outcome = decode_next(r#"[CHART:{"t":"a}b"}]"#, 0);
        assert!(
            matches!(outcome, DecodeOutcome::Unterminated { json_end: 15, .. }),
            "got {outcome:?}"
        );
    }

    #[test]
    fn test_incomplete_body() {
        assert_eq!(
            decode_next(r#"text [CHART:{"a":1"#, 0),
            DecodeOutcome::Incomplete {
                kind: WidgetKind::Chart,
                tag_start: 5
            }
        );
        // Prefix followed only by whitespace still waits for data
        assert_eq!(
            decode_next("[RISK:  ", 0),
            DecodeOutcome::Incomplete {
                kind: WidgetKind::Risk,
                tag_start: 0
            }
        );
    }

    #[test]
    fn test_no_json_body() {
        assert_eq!(
            decode_next("[CHART: price] rest", 0),
            DecodeOutcome::NoJsonBody {
                kind: WidgetKind::Chart,
                tag_start: 0
            }
        );
    }

    #[test]
    fn test_missing_terminator_while_streaming() {
        let buffer = r#"[CHART:{"a":1}  "#;
        assert_eq!(
            decode_next(buffer, 0),
            DecodeOutcome::Unterminated {
                kind: WidgetKind::Chart,
                tag_start: 0,
                json_end: 14
            }
        );
    }

    #[test]
    fn test_garbage_before_terminator_is_unterminated_not_malformed() {
        let outcome = decode_next(r#"[CHART:{"a":1}x]"#, 0);
        assert!(
            matches!(outcome, DecodeOutcome::Unterminated { .. }),
            "got {outcome:?}"
        );
    }

    #[test]
    fn test_malformed_payload() {
        let buffer = r#"[SENTIMENT:{ticker: TCS}] after"#;
        match decode_next(buffer, 0) {
            DecodeOutcome::Malformed { span, .. } => {
                assert_eq!(span.kind, WidgetKind::Sentiment);
                assert_eq!(&buffer[span.tag_end..], " after");
            }
            other => panic!("Expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_multibyte_text_around_tags() {
        let buffer = "Kurs ₹1,200 → [COMPARISON:{\"ticker1\":\"TCS\"}] ✓";
        match decode_next(buffer, 0) {
            DecodeOutcome::Decoded { span, .. } => {
                assert_eq!(span.kind, WidgetKind::Comparison);
                assert_eq!(&buffer[span.tag_end..], " ✓");
            }
            other => panic!("Expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_outcome_is_stable_as_buffer_grows() {
        let full = r#"a [RISK:{"score":1}] b [CHART:{"c":2}]"#;
        let first = decode_next(full, 0);
        for end in 20..=full.len() {
            assert_eq!(decode_next(&full[..end], 0), first, "prefix length {end}");
        }
    }
}
