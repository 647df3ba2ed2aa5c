//! Google Vision adapter producing structured findings for an image.
//!
//! Each detector is a separate `images:annotate` request; a failure in one
//! detector is logged and omitted from the findings without aborting the
//! others.

use crate::analysis::StructuredVisionBackend;
use crate::services::http::{create_http_client, post_json};
use crate::services::ServiceError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tracing::warn;

const VISION_ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Maximum label annotations included in the findings
const MAX_LABELS: u32 = 5;
/// Maximum landmark/logo annotations included in the findings
const MAX_PLACES: u32 = 3;
/// OCR text is truncated to this many characters
const OCR_TEXT_LIMIT: usize = 200;

/// Client for the Google Vision `images:annotate` endpoint.
pub struct VisionClient {
    http_client: HttpClient,
    api_key: String,
}

impl VisionClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: create_http_client(),
            api_key,
        }
    }

    /// Runs all detectors concurrently and collects the findings that
    /// succeeded, in a fixed order.
    pub async fn collect_findings(&self, image: &[u8]) -> Vec<String> {
        let content = BASE64.encode(image);

        let (labels, text, faces, landmarks, logos) = tokio::join!(
            self.detect(&content, "LABEL_DETECTION", MAX_LABELS),
            self.detect(&content, "TEXT_DETECTION", 1),
            self.detect(&content, "FACE_DETECTION", 0),
            self.detect(&content, "LANDMARK_DETECTION", MAX_PLACES),
            self.detect(&content, "LOGO_DETECTION", MAX_PLACES),
        );

        let findings = [
            labels.as_ref().ok().and_then(parse_labels),
            text.as_ref().ok().and_then(parse_text),
            faces.as_ref().ok().and_then(parse_faces),
            landmarks.as_ref().ok().and_then(parse_landmarks),
            logos.as_ref().ok().and_then(parse_logos),
        ];

        findings.into_iter().flatten().collect()
    }

    /// Issues one single-feature annotate request and returns the first
    /// (and only) per-image response object.
    async fn detect(
        &self,
        content_b64: &str,
        feature: &str,
        max_results: u32,
    ) -> Result<Value, ServiceError> {
        let mut feature_spec = json!({"type": feature});
        if max_results > 0 {
            feature_spec["maxResults"] = json!(max_results);
        }

        let body = json!({
            "requests": [{
                "image": {"content": content_b64},
                "features": [feature_spec]
            }]
        });

        let url = format!("{VISION_ANNOTATE_URL}?key={}", self.api_key);
        let res_json = post_json(&self.http_client, &url, &body)
            .await
            .inspect_err(|e| warn!("Vision {feature} request failed: {e}"))?;

        res_json
            .get("responses")
            .and_then(|r| r.get(0))
            .cloned()
            .ok_or_else(|| ServiceError::Api("missing responses[0] in annotate reply".to_string()))
    }
}

fn descriptions(response: &Value, key: &str, limit: usize) -> Vec<String> {
    response
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(limit)
                .filter_map(|a| a.get("description").and_then(Value::as_str))
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_labels(response: &Value) -> Option<String> {
    let labels = descriptions(response, "labelAnnotations", MAX_LABELS as usize);
    if labels.is_empty() {
        return None;
    }
    Some(format!("Objects Detected: {}", labels.join(", ")))
}

fn parse_text(response: &Value) -> Option<String> {
    // textAnnotations[0] carries the full OCR text; the rest are per-word.
    let detected = response
        .get("textAnnotations")
        .and_then(|a| a.get(0))
        .and_then(|a| a.get("description"))
        .and_then(Value::as_str)?
        .trim()
        .to_string();

    if detected.chars().count() <= 3 {
        return None;
    }

    let clipped = crate::utils::truncate_with_ellipsis(&detected, OCR_TEXT_LIMIT);
    Some(format!("Text Found: {clipped}"))
}

fn parse_faces(response: &Value) -> Option<String> {
    let count = response
        .get("faceAnnotations")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if count == 0 {
        return None;
    }
    Some(format!("Faces Detected: {count}"))
}

fn parse_landmarks(response: &Value) -> Option<String> {
    let landmarks = descriptions(response, "landmarkAnnotations", MAX_PLACES as usize);
    if landmarks.is_empty() {
        return None;
    }
    Some(format!("Landmarks: {}", landmarks.join(", ")))
}

fn parse_logos(response: &Value) -> Option<String> {
    let logos = descriptions(response, "logoAnnotations", MAX_PLACES as usize);
    if logos.is_empty() {
        return None;
    }
    Some(format!("Logos: {}", logos.join(", ")))
}

#[async_trait]
impl StructuredVisionBackend for VisionClient {
    async fn annotate(&self, image: &[u8]) -> Result<Vec<String>, ServiceError> {
        Ok(self.collect_findings(image).await)
    }
}
