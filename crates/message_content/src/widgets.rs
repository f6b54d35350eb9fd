//! Typed views of widget payloads.
//!
//! The assembler keeps payloads as raw JSON. Rendering goes through these
//! types so that a payload missing a required field is rejected instead of
//! being displayed with holes.

use crate::WidgetKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("{kind} payload has an invalid shape: {source}")]
    InvalidShape {
        kind: WidgetKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("{kind} payload field `{field}` out of range: {value}")]
    OutOfRange {
        kind: WidgetKind,
        field: &'static str,
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    #[serde(rename = "type")]
    pub chart_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<Value>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<Value>,
    /// Renderer hints such as `fill`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPayload {
    pub ticker: String,
    pub score: f64,
    pub level: String,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePayload {
    pub ticker: String,
    pub events: Vec<TimelineEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<PriceTargets>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTargets {
    pub bull: Value,
    pub bear: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPayload {
    pub ticker: String,
    pub overall: String,
    pub score: f64,
    pub articles: Vec<SentimentArticle>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentArticle {
    pub title: String,
    pub source: String,
    pub sentiment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPayload {
    pub ticker1: String,
    pub ticker2: String,
    pub data: Vec<ComparisonRow>,
}

/// One metric row; the values are keyed by ticker symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub metric: String,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl ComparisonRow {
    pub fn value_for(&self, ticker: &str) -> Option<&Value> {
        self.values.get(ticker)
    }
}

/// A validated widget payload
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Chart(ChartPayload),
    Risk(RiskPayload),
    Timeline(TimelinePayload),
    Sentiment(SentimentPayload),
    Comparison(ComparisonPayload),
}

impl Widget {
    pub fn from_payload(kind: WidgetKind, payload: &Value) -> Result<Self, WidgetError> {
        fn parse<T: serde::de::DeserializeOwned>(
            kind: WidgetKind,
            payload: &Value,
        ) -> Result<T, WidgetError> {
            T::deserialize(payload).map_err(|source| WidgetError::InvalidShape { kind, source })
        }

        let widget = match kind {
            WidgetKind::Chart => Widget::Chart(parse(kind, payload)?),
            WidgetKind::Risk => {
                let risk: RiskPayload = parse(kind, payload)?;
                check_score(kind, risk.score)?;
                Widget::Risk(risk)
            }
            WidgetKind::Timeline => Widget::Timeline(parse(kind, payload)?),
            WidgetKind::Sentiment => {
                let sentiment: SentimentPayload = parse(kind, payload)?;
                check_score(kind, sentiment.score)?;
                Widget::Sentiment(sentiment)
            }
            WidgetKind::Comparison => Widget::Comparison(parse(kind, payload)?),
        };
        Ok(widget)
    }

    pub fn kind(&self) -> WidgetKind {
        match self {
            Widget::Chart(_) => WidgetKind::Chart,
            Widget::Risk(_) => WidgetKind::Risk,
            Widget::Timeline(_) => WidgetKind::Timeline,
            Widget::Sentiment(_) => WidgetKind::Sentiment,
            Widget::Comparison(_) => WidgetKind::Comparison,
        }
    }
}

fn check_score(kind: WidgetKind, score: f64) -> Result<(), WidgetError> {
    if (0.0..=100.0).contains(&score) {
        Ok(())
    } else {
        Err(WidgetError::OutOfRange {
            kind,
            field: "score",
            value: score,
        })
    }
}
