// built-in
use std::time::Duration;

// external
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

// project
use crate::error::IngestError;
use crate::retry::{with_retry, CallError, RetryConfig};

const MAX_ERROR_BODY: usize = 512;

/// Build the shared HTTP client with a per-request timeout.
pub(crate) fn client(timeout: Duration) -> Result<Client, IngestError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| IngestError::Config(format!("failed to build HTTP client: {e}")))
}

/// Send the request produced by `build` (rebuilt per attempt) and decode a
/// JSON body. Errors come back as a human-readable message.
pub(crate) async fn send_json<R, F>(retry: &RetryConfig, build: F) -> Result<R, String>
where
    R: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    with_retry(retry, |_| {
        let request = build();
        async move {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(status_error(status, &body));
            }
            response
                .json::<R>()
                .await
                .map_err(|e| CallError::Fatal(format!("unexpected response body: {e}")))
        }
    })
    .await
}

fn transport_error(e: reqwest::Error) -> CallError {
    if e.is_timeout() || e.is_connect() {
        CallError::Transient(format!("transport error: {e}"))
    } else {
        CallError::Fatal(format!("transport error: {e}"))
    }
}

fn status_error(status: StatusCode, body: &str) -> CallError {
    let mut snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
    if snippet.len() < body.len() {
        snippet.push_str("...");
    }
    let msg = format!("HTTP {status}: {snippet}");
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        CallError::Transient(msg)
    } else {
        CallError::Fatal(msg)
    }
}
