//! Upstream API adapters.
//!
//! Each adapter wraps exactly one upstream call pattern: build the request,
//! issue a single call with a fixed timeout, map non-success statuses and
//! network failures to a typed error, and copy the interesting fields into a
//! flat record. No retries, no pagination beyond one page, no caching.

pub mod gemini;
pub mod http;
pub mod removebg;
pub mod tmdb;
pub mod vision;
pub mod youtube;

use thiserror::Error;

/// Failures surfaced by the upstream API adapters.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Connectivity failure before a response was received
    #[error("Network error: {0}")]
    Network(String),
    /// Non-success status or malformed payload from the upstream API
    #[error("API error: {0}")]
    Api(String),
    /// Response body could not be parsed as the expected JSON shape
    #[error("JSON error: {0}")]
    Json(String),
    /// remove.bg rejected the image (HTTP 400)
    #[error("Invalid image format. Please use JPG, PNG, or GIF.")]
    InvalidImageFormat,
    /// remove.bg credit quota exhausted (HTTP 402)
    #[error("Background removal quota exceeded. Please try again later.")]
    QuotaExceeded,
}
