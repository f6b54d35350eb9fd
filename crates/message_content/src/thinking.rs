use regex::Regex;

/// Result of separating the reasoning block from the visible buffer
#[derive(Debug, Clone, PartialEq)]
pub struct ThinkingExtraction {
    /// The buffer with the reasoning block removed
    pub visible: String,
    /// Trimmed reasoning text, if a non-empty block was found
    pub thinking: Option<String>,
    /// True while an opening marker has been seen without its closing marker
    pub open: bool,
}

/// Removes at most one `<thinking ...>...</thinking>` block from a message buffer
pub struct ThinkingExtractor {
    block: Regex,
    start_marker: Regex,
    end_marker: Regex,
}

impl Default for ThinkingExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkingExtractor {
    pub fn new() -> Self {
        Self {
            block: Regex::new(r"(?is)<thinking\b[^>]*>(.*?)</thinking>")
                .expect("valid thinking block pattern"),
            start_marker: Regex::new(r"(?i)<thinking\b[^>]*>").expect("valid start marker pattern"),
            end_marker: Regex::new(r"(?i)</thinking>").expect("valid end marker pattern"),
        }
    }

    pub fn extract(&self, buffer: &str) -> ThinkingExtraction {
        if let Some(caps) = self.block.captures(buffer) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let thinking = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let mut visible = String::with_capacity(buffer.len() - whole.len());
            visible.push_str(&buffer[..whole.start]);
            visible.push_str(&buffer[whole.end..]);
            return ThinkingExtraction {
                visible: visible.trim().to_string(),
                thinking: non_empty(thinking),
                open: false,
            };
        }

        let start = self.start_marker.find(buffer);
        let end = self.end_marker.find(buffer);

        match (start, end) {
            // Block still streaming: everything after the marker is provisional
            (Some(start), None) => ThinkingExtraction {
                visible: buffer[..start.start()].trim().to_string(),
                thinking: non_empty(buffer[start.end()..].trim()),
                open: true,
            },
            // Truncated history: the opening marker was cut off, keep what follows
            // the last closing marker
            (None, Some(_)) => {
                let tail_start = self
                    .end_marker
                    .find_iter(buffer)
                    .last()
                    .map(|m| m.end())
                    .unwrap_or(0);
                ThinkingExtraction {
                    visible: buffer[tail_start..].trim().to_string(),
                    thinking: None,
                    open: false,
                }
            }
            _ => ThinkingExtraction {
                visible: buffer.to_string(),
                thinking: None,
                open: false,
            },
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
