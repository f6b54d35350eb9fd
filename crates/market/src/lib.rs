mod client;
mod symbols;
#[cfg(test)]
mod tests;

pub use client::{MarketClient, MarketError, StockData, StockSearchResult, DEFAULT_BASE_URL};
pub use symbols::{display_symbol, to_provider_symbol};
