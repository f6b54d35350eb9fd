//! HTTP gateway between chat clients, the AI agent and the market data provider

mod chat;
mod sessions;
mod stock;


use crate::config::{GatewayConfig, USER_ID};
use crate::persistence::{ChatRecord, FileMessageLog, MessageLog};
use agent::AgentClient;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use market::MarketClient;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub agent: AgentClient,
    pub market: MarketClient,
    pub log: Arc<dyn MessageLog>,
    /// Upper bound for one streamed agent response
    pub agent_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        // The per-request deadline is enforced by the relay; the client timeout
        // only guards against a connection that never completes.
        let agent = AgentClient::with_timeout(&config.agent_url, config.agent_timeout * 2)
            .context("Failed to create agent client")?;
        let market =
            MarketClient::new(&config.market_url).context("Failed to create market client")?;
        Ok(Self {
            agent,
            market,
            log: Arc::new(FileMessageLog::new(config.data_dir.clone())),
            agent_timeout: config.agent_timeout,
        })
    }

    /// Persist a message; failures are logged and otherwise ignored
    pub(crate) async fn record(&self, record: anyhow::Result<ChatRecord>) {
        let log = self.log.clone();
        let result = tokio::task::spawn_blocking(move || log.append(&record?)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to persist message: {:#}", e),
            Err(e) => warn!("Persistence task failed: {}", e),
        }
    }
}

/// JSON error response: `{"error": ..., "message"?: ...}`
#[derive(Debug)]
pub struct ServerError {
    status: StatusCode,
    error: String,
    message: Option<String>,
}

impl ServerError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            message: None,
        }
    }

    /// An upstream call failed; `error` is the client-facing summary
    pub fn upstream(error: impl Into<String>, cause: &anyhow::Error) -> Self {
        let error = error.into();
        warn!("{}: {:#}", error, cause);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
            message: Some(cause.to_string()),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = match self.message {
            Some(message) => json!({ "error": self.error, "message": message }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat))
        .route(
            "/api/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route("/api/sessions/:id", get(sessions::get_session))
        .route("/api/stock/search", get(stock::search))
        .route("/api/stock/:symbol", get(stock::stock_data))
        .route("/api/history", get(history))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: GatewayConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Gateway listening on http://{}", listener.local_addr()?);
    info!("Forwarding chat to {}", config.agent_url);
    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}

async fn history(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    let log = state.log.clone();
    let records = tokio::task::spawn_blocking(move || log.history(USER_ID))
        .await
        .map_err(|e| ServerError::upstream("Failed to load history", &e.into()))?
        .map_err(|e| ServerError::upstream("Failed to load history", &e))?;
    Ok(Json(records))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
