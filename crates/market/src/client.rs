use crate::symbols::{display_symbol, strip_exchange_suffix, to_provider_symbol};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = concat!("stock-chat/", env!("CARGO_PKG_VERSION"));
const MAX_RESULTS: usize = 10;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Symbol must not be empty")]
    EmptySymbol,

    #[error("No market data for {0}")]
    NotFound(String),

    #[error("Market data provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Failed to reach market data provider: {0}")]
    Network(#[from] reqwest::Error),
}

/// Price history for one symbol, passed through from the provider
#[derive(Debug, Clone, Serialize)]
pub struct StockData {
    pub symbol: String,
    #[serde(rename = "providerSymbol")]
    pub provider_symbol: String,
    pub chart: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSearchResult {
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub quote_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    symbol: Option<String>,
    shortname: Option<String>,
    longname: Option<String>,
    exchange: Option<String>,
    #[serde(rename = "quoteType")]
    quote_type: Option<String>,
}

impl SearchQuote {
    fn name(&self) -> String {
        self.longname
            .clone()
            .or_else(|| self.shortname.clone())
            .or_else(|| self.symbol.clone())
            .unwrap_or_default()
    }

    fn is_indian(&self) -> bool {
        matches!(self.exchange.as_deref(), Some("NSI") | Some("BSE"))
            || self
                .symbol
                .as_deref()
                .is_some_and(|s| s.ends_with(".NS") || s.ends_with(".BO"))
    }
}

const POPULAR_STOCKS: &[(&str, &str)] = &[
    ("RELIANCE", "Reliance Industries Ltd"),
    ("TCS", "Tata Consultancy Services"),
    ("INFY", "Infosys Ltd"),
    ("HDFCBANK", "HDFC Bank Ltd"),
    ("ICICIBANK", "ICICI Bank Ltd"),
];

/// Client for the market-data provider
#[derive(Clone)]
pub struct MarketClient {
    http_client: Client,
    base_url: String,
}

impl MarketClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MarketError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// One year of daily price history for `symbol`
    pub async fn stock_data(&self, symbol: &str) -> Result<StockData, MarketError> {
        if symbol.trim().is_empty() {
            return Err(MarketError::EmptySymbol);
        }
        let provider_symbol = to_provider_symbol(symbol);
        let endpoint = format!("{}/v8/finance/chart/{}", self.base_url, provider_symbol);
        debug!("Fetching chart data for {}", provider_symbol);

        let response = self
            .http_client
            .get(endpoint)
            .query(&[("range", "1y"), ("interval", "1d")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound(provider_symbol));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        let chart = body
            .get("chart")
            .and_then(|chart| chart.get("result"))
            .and_then(|result| result.get(0))
            .cloned()
            .ok_or_else(|| MarketError::NotFound(provider_symbol.clone()))?;

        Ok(StockData {
            symbol: display_symbol(symbol),
            provider_symbol,
            chart,
        })
    }

    /// Search for listed stocks, preferring NSE/BSE listings.
    ///
    /// Never fails: if the provider cannot be queried, matching entries from
    /// a fixed list of popular stocks are returned instead.
    pub async fn search(&self, query: &str) -> Vec<StockSearchResult> {
        match self.search_provider(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Stock search for '{}' failed, using fallback list: {}", query, e);
                popular_stocks_matching(query)
            }
        }
    }

    async fn search_provider(&self, query: &str) -> Result<Vec<StockSearchResult>, MarketError> {
        let endpoint = format!("{}/v1/finance/search", self.base_url);
        let response = self
            .http_client
            .get(endpoint)
            .query(&[("q", query), ("quotesCount", "10"), ("newsCount", "0")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let response: SearchResponse = response.json().await?;
        Ok(filter_quotes(response.quotes))
    }
}

fn filter_quotes(quotes: Vec<SearchQuote>) -> Vec<StockSearchResult> {
    let indian: Vec<StockSearchResult> = quotes
        .iter()
        .filter(|q| q.is_indian())
        .map(|q| {
            let exchange = match q.exchange.as_deref() {
                Some("BSE") => "BSE",
                _ => "NSE",
            };
            StockSearchResult {
                symbol: q
                    .symbol
                    .as_deref()
                    .map(strip_exchange_suffix)
                    .unwrap_or_default()
                    .to_string(),
                name: q.name(),
                exchange: Some(exchange.to_string()),
                quote_type: q.quote_type.clone(),
            }
        })
        .collect();

    if !indian.is_empty() {
        return indian;
    }

    quotes
        .iter()
        .filter(|q| q.quote_type.as_deref() == Some("EQUITY"))
        .take(MAX_RESULTS)
        .map(|q| StockSearchResult {
            symbol: q.symbol.clone().unwrap_or_default(),
            name: q.name(),
            exchange: q.exchange.clone(),
            quote_type: q.quote_type.clone(),
        })
        .collect()
}

fn popular_stocks_matching(query: &str) -> Vec<StockSearchResult> {
    let query = query.to_lowercase();
    POPULAR_STOCKS
        .iter()
        .filter(|(symbol, name)| {
            symbol.to_lowercase().contains(&query) || name.to_lowercase().contains(&query)
        })
        .map(|(symbol, name)| StockSearchResult {
            symbol: symbol.to_string(),
            name: name.to_string(),
            exchange: Some("NSE".to_string()),
            quote_type: None,
        })
        .collect()
}
