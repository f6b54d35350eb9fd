//! Plain-text rendering of parsed assistant messages for the terminal

use message_content::{ContentSegment, RenderModel, Widget};
use serde_json::Value;
use std::fmt::Write;
use tracing::warn;

pub fn render_model(model: &RenderModel, show_thinking: bool) -> String {
    let mut out = String::new();

    if let Some(thinking) = &model.thinking {
        if show_thinking {
            let _ = writeln!(out, "Thinking:");
            for line in thinking.lines() {
                let _ = writeln!(out, "  | {line}");
            }
            let _ = writeln!(out);
        } else {
            let words = thinking.split_whitespace().count();
            let state = if model.thinking_open { ", in progress" } else { "" };
            let _ = writeln!(out, "[thinking: {words} words{state}]\n");
        }
    }

    let blocks: Vec<String> = model.segments.iter().filter_map(render_segment).collect();
    out.push_str(&blocks.join("\n\n"));
    out
}

fn render_segment(segment: &ContentSegment) -> Option<String> {
    if let Some(text) = segment.as_text() {
        return Some(text.to_string());
    }
    match segment.to_widget()? {
        Ok(widget) => Some(render_widget(&widget)),
        Err(e) => {
            warn!("Skipping widget: {}", e);
            None
        }
    }
}

pub fn render_widget(widget: &Widget) -> String {
    let mut out = String::new();
    match widget {
        Widget::Chart(chart) => {
            let title = chart.title.as_deref().unwrap_or("Chart");
            let _ = write!(out, "[{} chart] {}", chart.chart_type, title);
            if let (Some(first), Some(last)) = (chart.data.labels.first(), chart.data.labels.last())
            {
                let _ = write!(out, " ({} .. {})", plain(first), plain(last));
            }
            for dataset in &chart.data.datasets {
                let latest = dataset.data.last().map(plain).unwrap_or_default();
                let _ = write!(
                    out,
                    "\n  {}: {} points, latest {}",
                    dataset.label,
                    dataset.data.len(),
                    latest
                );
            }
        }
        Widget::Risk(risk) => {
            let _ = write!(
                out,
                "[risk] {} score {}/100 ({})",
                risk.ticker, risk.score, risk.level
            );
            for factor in &risk.factors {
                let _ = write!(out, "\n  - {factor}");
            }
        }
        Widget::Timeline(timeline) => {
            let _ = write!(out, "[timeline] {}", timeline.ticker);
            for event in &timeline.events {
                let _ = write!(out, "\n  {}  {}", event.date, event.title);
                if !event.desc.is_empty() {
                    let _ = write!(out, ": {}", event.desc);
                }
            }
            if let Some(targets) = &timeline.targets {
                let _ = write!(
                    out,
                    "\n  targets: bull {} / bear {}",
                    plain(&targets.bull),
                    plain(&targets.bear)
                );
            }
        }
        Widget::Sentiment(sentiment) => {
            let _ = write!(
                out,
                "[sentiment] {} {} ({}/100)",
                sentiment.ticker, sentiment.overall, sentiment.score
            );
            for article in &sentiment.articles {
                let _ = write!(
                    out,
                    "\n  - {} ({}, {})",
                    article.title, article.source, article.sentiment
                );
            }
            if !sentiment.sources.is_empty() {
                let _ = write!(out, "\n  sources: {}", sentiment.sources.join(", "));
            }
        }
        Widget::Comparison(comparison) => {
            let (t1, t2) = (&comparison.ticker1, &comparison.ticker2);
            let _ = write!(out, "[comparison] {t1} vs {t2}");
            for row in &comparison.data {
                let v1 = row.value_for(t1).map(plain).unwrap_or_else(|| "-".into());
                let v2 = row.value_for(t2).map(plain).unwrap_or_else(|| "-".into());
                let _ = write!(out, "\n  {}: {} | {}", row.metric, v1, v2);
            }
        }
    }
    out
}

/// JSON scalar without string quotes
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
