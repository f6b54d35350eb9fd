use regex::Regex;
use std::borrow::Cow;

/// Cleans prose segments before display.
///
/// Removes widget tags that were skipped by the decoder, leaked tool-call
/// JSON, SSE envelope fragments and stray bracket/quote noise. Patterns that
/// do not match leave the text unchanged.
pub struct TextSanitizer {
    widget_tag: Regex,
    thinking_marker: Regex,
    tool_response: Regex,
    result_json: Regex,
    sse_prefix: Regex,
    sse_suffix: Regex,
    leading_noise: Regex,
    trailing_noise: Regex,
    noise_line: Regex,
    blank_run: Regex,
}

impl Default for TextSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSanitizer {
    pub fn new() -> Self {
        let pattern = |p: &str| Regex::new(p).expect("valid sanitizer pattern");
        Self {
            widget_tag: pattern(r"\[(?:CHART|RISK|TIMELINE|SENTIMENT|COMPARISON):\{[\s\S]*?\}\]"),
            thinking_marker: pattern(r"(?i)</?thinking\b[^>]*>"),
            tool_response: pattern(r#"\{"generate_[a-z_]+_response":[\s\S]*?\}"#),
            result_json: pattern(r#"\{"result":\s*"[^"]+"\}"#),
            sse_prefix: pattern(r#"\{"content":\s*""#),
            sse_suffix: pattern(r#""\}\s*"#),
            leading_noise: pattern(r#"^\s*["{}\[\]]+\s*"#),
            trailing_noise: pattern(r#"\s*["{}\[\]]+\s*$"#),
            noise_line: pattern(r#"(?m)^\s*["{}\[\]]+\s*$"#),
            blank_run: pattern(r"\n\s*\n\s*\n"),
        }
    }

    /// Returns the displayable part of `text`, or an empty string if nothing is left
    pub fn clean(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let mut cleaned: Cow<'_, str> = Cow::Borrowed(text);

        for re in [
            &self.widget_tag,
            &self.thinking_marker,
            &self.tool_response,
            &self.result_json,
            &self.sse_prefix,
            &self.sse_suffix,
        ] {
            if let Cow::Owned(replaced) = re.replace_all(&cleaned, "") {
                cleaned = Cow::Owned(replaced);
            }
        }

        if cleaned.contains("\\n") {
            cleaned = Cow::Owned(cleaned.replace("\\n", "\n"));
        }

        if let Cow::Owned(replaced) = self.leading_noise.replace(&cleaned, "") {
            cleaned = Cow::Owned(replaced);
        }
        if let Cow::Owned(replaced) = self.trailing_noise.replace(&cleaned, "") {
            cleaned = Cow::Owned(replaced);
        }
        if let Cow::Owned(replaced) = self.noise_line.replace_all(&cleaned, "") {
            cleaned = Cow::Owned(replaced);
        }
        if let Cow::Owned(replaced) = self.blank_run.replace_all(&cleaned, "\n\n") {
            cleaned = Cow::Owned(replaced);
        }

        cleaned.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_is_unchanged() {
        let sanitizer = TextSanitizer::new();
        let text = "TCS closed higher today.\n\n- Revenue grew 8%\n- Margins held at 24%\n\nOverall the outlook is stable.";
        assert_eq!(sanitizer.clean(text), text);
        assert_eq!(sanitizer.clean(&sanitizer.clean(text)), text);
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let sanitizer = TextSanitizer::new();
        assert_eq!(sanitizer.clean("  \n\t "), "");
        assert_eq!(sanitizer.clean(""), "");
    }

    #[test]
    fn test_strips_leftover_widget_tags_and_markers() {
        let sanitizer = TextSanitizer::new();
        let text = r#"Before [RISK:{"score":"x"}] after </thinking>"#;
        assert_eq!(sanitizer.clean(text), "Before  after");
    }

    #[test]
    fn test_strips_tool_response_leakage() {
        let sanitizer = TextSanitizer::new();
        let text = r#"Here is the chart. {"generate_chart_response": {"result": "Chart displayed."} More text"#;
        let cleaned = sanitizer.clean(text);
        assert!(!cleaned.contains("generate_chart_response"), "{cleaned}");
        assert!(cleaned.starts_with("Here is the chart."));

        let text = r#"Done {"result": "Chart displayed."} next"#;
        assert_eq!(sanitizer.clean(text), "Done  next");
    }

    #[test]
    fn test_strips_sse_envelope_and_unescapes_newlines() {
        let sanitizer = TextSanitizer::new();
        let text = r#"{"content": "First line\nSecond line"}"#;
        assert_eq!(sanitizer.clean(text), "First line\nSecond line");
    }

    #[test]
    fn test_trims_orphaned_brackets_and_quotes() {
        let sanitizer = TextSanitizer::new();
        assert_eq!(sanitizer.clean("\"}  Result text  ]"), "Result text");
        assert_eq!(sanitizer.clean("line one\n}\nline two"), "line one\n\nline two");
        assert_eq!(sanitizer.clean("{}"), "");
    }

    #[test]
    fn test_collapses_blank_line_runs() {
        let sanitizer = TextSanitizer::new();
        assert_eq!(sanitizer.clean("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(sanitizer.clean("a\n \n\t\n b"), "a\n\n b");
    }
}
