use super::{AppState, ServerError};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use market::{MarketError, StockData, StockSearchResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

/// `GET /api/stock/search?q=`
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<StockSearchResult>>, ServerError> {
    let q = match query.q {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(ServerError::bad_request("Search query is required")),
    };
    Ok(Json(state.market.search(&q).await))
}

/// `GET /api/stock/:symbol`
pub async fn stock_data(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockData>, ServerError> {
    match state.market.stock_data(&symbol).await {
        Ok(data) => Ok(Json(data)),
        Err(e) => {
            let status = match e {
                MarketError::NotFound(_) => StatusCode::NOT_FOUND,
                MarketError::EmptySymbol => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err(ServerError::upstream("Failed to fetch stock data", &e.into()).with_status(status))
        }
    }
}
