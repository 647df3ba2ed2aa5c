//! Shared HTTP request/response handling for the API adapters.

use crate::config::get_http_timeout_secs;
use crate::services::ServiceError;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

/// Creates an HTTP client configured with the standard upstream timeout.
///
/// Uses the `HTTP_TIMEOUT_SECS` environment variable or a 30s default.
/// This prevents infinite hangs when an API is slow or unresponsive.
#[must_use]
pub fn create_http_client() -> HttpClient {
    let timeout = Duration::from_secs(get_http_timeout_secs());
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Sends a GET request with query parameters and returns parsed JSON.
///
/// # Errors
///
/// Returns `ServiceError::Network` on connectivity issues,
/// `ServiceError::Api` on non-success status codes, or
/// `ServiceError::Json` if parsing fails.
pub async fn get_json(
    client: &HttpClient,
    url: &str,
    query: &[(&str, &str)],
) -> Result<Value, ServiceError> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ServiceError::Network(e.to_string()))?;

    check_status_and_parse(response).await
}

/// Sends a POST request with a JSON body and returns parsed JSON.
///
/// # Errors
///
/// Returns `ServiceError::Network` on connectivity issues,
/// `ServiceError::Api` on non-success status codes, or
/// `ServiceError::Json` if parsing fails.
pub async fn post_json(
    client: &HttpClient,
    url: &str,
    body: &Value,
) -> Result<Value, ServiceError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| ServiceError::Network(e.to_string()))?;

    check_status_and_parse(response).await
}

async fn check_status_and_parse(response: reqwest::Response) -> Result<Value, ServiceError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| ServiceError::Json(e.to_string()))
}

/// Turns a non-success response into an `Api` error with a readable message.
///
/// Proxies in front of the upstream APIs sometimes answer with HTML error
/// pages; those are collapsed to the status code instead of being quoted.
pub async fn api_error(response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();

    let is_html = error_text.trim_start().starts_with("<!DOCTYPE")
        || error_text.trim_start().starts_with("<html")
        || error_text.trim_start().starts_with("<HTML");

    if is_html {
        return ServiceError::Api(format!("{status} (server returned HTML error page)"));
    }

    let truncated = if error_text.chars().count() > 500 {
        let head: String = error_text.chars().take(500).collect();
        format!("{head}... (truncated)")
    } else {
        error_text
    };
    ServiceError::Api(format!("{status} - {truncated}"))
}

/// Extracts text content from a JSON response by navigating a path.
///
/// Path segments may be object keys or numeric array indices, e.g.
/// `["candidates", "0", "content", "parts", "0", "text"]` for Gemini.
///
/// # Errors
///
/// Returns `ServiceError::Api` if the path is invalid or the target is not
/// a string.
pub fn extract_text_content(response: &Value, path: &[&str]) -> Result<String, ServiceError> {
    let mut current = response;

    for segment in path {
        if let Ok(index) = segment.parse::<usize>() {
            current = current
                .get(index)
                .ok_or_else(|| ServiceError::Api(format!("Invalid path: missing index {index}")))?;
        } else {
            current = current
                .get(*segment)
                .ok_or_else(|| ServiceError::Api(format!("Invalid path: missing key {segment}")))?;
        }
    }

    current
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| ServiceError::Api(format!("Expected string at path, got: {current:?}")))
}
