use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// There is no authentication; every message is logged under this user
pub const USER_ID: &str = "default_user";

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_AGENT_URL: &str = "http://localhost:8001";
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000";
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub port: u16,
    pub agent_url: String,
    pub market_url: String,
    pub agent_timeout: Duration,
    pub data_dir: PathBuf,
}

/// Command line values that take precedence over the environment
#[derive(Debug, Default)]
pub struct GatewayOverrides {
    pub port: Option<u16>,
    pub agent_url: Option<String>,
    pub market_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl GatewayConfig {
    pub fn load(overrides: GatewayOverrides) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: GatewayOverrides,
    ) -> Result<Self> {
        let port = match overrides.port {
            Some(port) => port,
            None => match lookup("PORT") {
                Some(value) => value
                    .parse()
                    .with_context(|| format!("Invalid PORT value: {value}"))?,
                None => DEFAULT_PORT,
            },
        };

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => match lookup("AGENT_TIMEOUT_SECS") {
                Some(value) => value
                    .parse()
                    .with_context(|| format!("Invalid AGENT_TIMEOUT_SECS value: {value}"))?,
                None => DEFAULT_AGENT_TIMEOUT_SECS,
            },
        };

        let data_dir = match overrides
            .data_dir
            .or_else(|| lookup("STOCK_CHAT_DATA_DIR").map(PathBuf::from))
        {
            Some(dir) => dir,
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("stock-chat"),
        };

        Ok(Self {
            port,
            agent_url: overrides
                .agent_url
                .or_else(|| lookup("AI_AGENT_URL"))
                .unwrap_or_else(|| DEFAULT_AGENT_URL.to_string()),
            market_url: overrides
                .market_url
                .or_else(|| lookup("MARKET_DATA_URL"))
                .unwrap_or_else(|| market::DEFAULT_BASE_URL.to_string()),
            agent_timeout: Duration::from_secs(timeout_secs),
            data_dir,
        })
    }
}

/// Gateway URL for the terminal client
pub fn gateway_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("GATEWAY_URL").ok())
        .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string())
}
