use crate::ApiError;
use anyhow::Result;
use reqwest::{Response, StatusCode};

/// Check response status.
/// Returns Ok(Response) if successful, or the matching `ApiError` if not.
pub async fn check_response_error(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let response_text = response
        .text()
        .await
        .map_err(|e| ApiError::NetworkError(e.to_string()))?;

    let error = match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::InvalidRequest(response_text)
        }
        StatusCode::NOT_FOUND => ApiError::NotFound(response_text),
        status if status.is_server_error() => ApiError::ServiceError(response_text),
        _ => ApiError::Unknown(format!("Status {status}: {response_text}")),
    };

    Err(error.into())
}

/// Map a reqwest transport failure, keeping timeouts distinguishable
pub fn network_error(error: reqwest::Error, timeout_secs: u64) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout(timeout_secs)
    } else {
        ApiError::NetworkError(error.to_string())
    }
}
