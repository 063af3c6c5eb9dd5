// ABOUTME: Shared HTTP plumbing for the decksmith application
// ABOUTME: Builds blocking clients and maps non-success responses to errors

use crate::errors::{DeckError, Result};
use reqwest::blocking::{Client, Response};
use std::time::Duration;

/// Build a blocking HTTP client, optionally with a per-request timeout.
pub(crate) fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(DeckError::TransportError)
}

/// Pass a successful response through, or turn a non-success status into an
/// `ApiError` carrying the operation name and whatever body the server sent.
pub(crate) fn require_success(operation: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .unwrap_or_else(|_| "<unreadable response body>".to_string());
    Err(DeckError::ApiError {
        operation,
        status: status.as_u16(),
        message,
    })
}
