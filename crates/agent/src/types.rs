use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Scope of the analysis the agent should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Overall,
    Stock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Strategic,
    Balanced,
}

/// Chat request as sent by clients to the gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "stockSymbol", default, skip_serializing_if = "Option::is_none")]
    pub stock_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnalysisMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<RiskProfile>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Validate and convert into the request forwarded to the agent.
    /// A missing or blank message is rejected.
    pub fn into_agent_request(self) -> Result<AgentChatRequest, ApiError> {
        let message = match self.message {
            Some(message) if !message.trim().is_empty() => message,
            _ => return Err(ApiError::InvalidRequest("Message is required".to_string())),
        };
        Ok(AgentChatRequest {
            message,
            stock_symbol: self.stock_symbol,
            session_id: self.session_id,
            mode: self.mode,
            profile: self.profile,
        })
    }
}

/// Chat request body of the agent's `/chat` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnalysisMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<RiskProfile>,
}

/// Errors talking to the agent service
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    /// The agent reported an error inside an otherwise successful stream
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_renames_symbol() {
        let request: ChatRequest = serde_json::from_value(json!({
            "message": "How is TCS doing?",
            "stockSymbol": "TCS",
            "session_id": "s-1",
            "mode": "stock",
            "profile": "balanced"
        }))
        .unwrap();

        let agent_request = request.into_agent_request().unwrap();
        assert_eq!(
            serde_json::to_value(&agent_request).unwrap(),
            json!({
                "message": "How is TCS doing?",
                "stock_symbol": "TCS",
                "session_id": "s-1",
                "mode": "stock",
                "profile": "balanced"
            })
        );
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let agent_request = ChatRequest::new("hi").into_agent_request().unwrap();
        assert_eq!(
            serde_json::to_value(&agent_request).unwrap(),
            json!({ "message": "hi" })
        );
    }

    #[test]
    fn test_missing_or_blank_message_rejected() {
        for body in [json!({}), json!({ "message": "  \n" }), json!({ "stockSymbol": "TCS" })] {
            let request: ChatRequest = serde_json::from_value(body).unwrap();
            let err = request.into_agent_request().unwrap_err();
            assert_eq!(err.to_string(), "Invalid request: Message is required");
        }
    }
}
