use super::*;
use mockito::{Matcher, Server};
use serde_json::json;

fn json_body(value: serde_json::Value) -> String {
    value.to_string()
}

#[tokio::test]
async fn test_stock_data_normalizes_symbol() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v8/finance/chart/TCS.NS")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("range".into(), "1y".into()),
            Matcher::UrlEncoded("interval".into(), "1d".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json_body(json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "TCS.NS", "currency": "INR" },
                    "timestamp": [1760000000, 1760086400],
                    "indicators": { "quote": [{ "close": [4100.5, 4120.0] }] }
                }],
                "error": null
            }
        })))
        .create_async()
        .await;

    let client = MarketClient::new(server.url()).unwrap();
    let data = client.stock_data("tcs").await.unwrap();

    mock.assert_async().await;
    assert_eq!(data.symbol, "TCS");
    assert_eq!(data.provider_symbol, "TCS.NS");
    assert_eq!(data.chart["meta"]["currency"], "INR");
}

#[tokio::test]
async fn test_stock_data_not_found() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v8/finance/chart/NOPE.NS")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#)
        .create_async()
        .await;

    let client = MarketClient::new(server.url()).unwrap();
    let err = client.stock_data("nope").await.unwrap_err();
    assert!(matches!(err, MarketError::NotFound(symbol) if symbol == "NOPE.NS"));
}

#[tokio::test]
async fn test_stock_data_rejects_empty_symbol() {
    let client = MarketClient::new("http://127.0.0.1:1").unwrap();
    assert!(matches!(
        client.stock_data("  ").await,
        Err(MarketError::EmptySymbol)
    ));
}

#[tokio::test]
async fn test_search_prefers_indian_listings() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/finance/search")
        .match_query(Matcher::UrlEncoded("q".into(), "tata".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json_body(json!({
            "quotes": [
                { "symbol": "TTM", "shortname": "Tata Motors ADR", "exchange": "NYQ", "quoteType": "EQUITY" },
                { "symbol": "TATASTEEL.NS", "longname": "Tata Steel Limited", "exchange": "NSI", "quoteType": "EQUITY" },
                { "symbol": "TATAPOWER.BO", "shortname": "TATA POWER", "exchange": "BSE", "quoteType": "EQUITY" }
            ]
        })))
        .create_async()
        .await;

    let client = MarketClient::new(server.url()).unwrap();
    let results = client.search("tata").await;

    assert_eq!(
        results,
        vec![
            StockSearchResult {
                symbol: "TATASTEEL".into(),
                name: "Tata Steel Limited".into(),
                exchange: Some("NSE".into()),
                quote_type: Some("EQUITY".into()),
            },
            StockSearchResult {
                symbol: "TATAPOWER".into(),
                name: "TATA POWER".into(),
                exchange: Some("BSE".into()),
                quote_type: Some("EQUITY".into()),
            },
        ]
    );
}

#[tokio::test]
async fn test_search_falls_back_to_equities() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/finance/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json_body(json!({
            "quotes": [
                { "symbol": "AAPL", "longname": "Apple Inc.", "exchange": "NMS", "quoteType": "EQUITY" },
                { "symbol": "^GSPC", "shortname": "S&P 500", "exchange": "SNP", "quoteType": "INDEX" }
            ]
        })))
        .create_async()
        .await;

    let client = MarketClient::new(server.url()).unwrap();
    let results = client.search("apple").await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].symbol, "AAPL");
    assert_eq!(results[0].exchange.as_deref(), Some("NMS"));
}

#[tokio::test]
async fn test_search_uses_popular_list_on_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/finance/search")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = MarketClient::new(server.url()).unwrap();
    let results = client.search("Tata").await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].symbol, "TCS");

    // Unreachable provider behaves the same
    let offline = MarketClient::new("http://127.0.0.1:1").unwrap();
    let results = offline.search("bank").await;
    let symbols: Vec<_> = results.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["HDFCBANK", "ICICIBANK"]);
}
