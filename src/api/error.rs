use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Errors surfaced by calls against the table service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed: connection refused, timeout, or a body
    /// that broke off mid-transfer.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service rejected the request as malformed (HTTP 400). The message
    /// is the service's own wording, e.g. "Player name cannot be empty".
    #[error("{0}")]
    BadRequest(String),

    /// The table (or player) is unknown to the service (HTTP 404).
    #[error("{0}")]
    NotFound(String),

    /// Any other non-success status. The service reports rejected turn
    /// actions this way, with an "Invalid action: ..." body.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus {
        status: StatusCode,
        message: String,
    },

    /// The response body does not decode into the expected shape.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Maps a non-success response to the matching error. The service writes
/// error bodies as plain text with a trailing newline, so the message is
/// trimmed before it is surfaced.
pub(super) async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await?.trim_end().to_owned();
    Err(match status {
        StatusCode::BAD_REQUEST => ApiError::BadRequest(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        _ => ApiError::UnexpectedStatus { status, message },
    })
}
