//! Gemini adapter for text generation and media narration.

use crate::analysis::{MediaKind, NarrativeBackend};
use crate::config::{
    GEMINI_MEDIA_MODEL, GEMINI_TEXT_MODEL, IMAGE_ANALYSIS_PROMPT, VIDEO_ANALYSIS_PROMPT,
};
use crate::services::http::{create_http_client, extract_text_content, post_json};
use crate::services::ServiceError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client as HttpClient;
use serde_json::json;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
}

impl GeminiClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: create_http_client(),
            api_key,
        }
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{GEMINI_API_BASE}/{model_id}:generateContent?key={}", self.api_key)
    }

    /// Generates a free-text response to a plain prompt.
    ///
    /// # Errors
    ///
    /// Returns a `ServiceError` on network failure, non-success status, or
    /// an unexpected response shape.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }]
        });

        let res_json = post_json(&self.http_client, &self.endpoint(GEMINI_TEXT_MODEL), &body).await?;
        extract_text_content(
            &res_json,
            &["candidates", "0", "content", "parts", "0", "text"],
        )
    }

    /// Sends media bytes plus the fixed per-kind analysis prompt and returns
    /// the narrated description.
    ///
    /// # Errors
    ///
    /// Returns a `ServiceError` on network failure, non-success status, or
    /// an unexpected response shape.
    pub async fn narrate_media(
        &self,
        media: &[u8],
        kind: MediaKind,
    ) -> Result<String, ServiceError> {
        let (prompt, mime_type) = match kind {
            MediaKind::Image => (IMAGE_ANALYSIS_PROMPT, "image/jpeg"),
            MediaKind::Video => (VIDEO_ANALYSIS_PROMPT, "video/mp4"),
        };

        let body = json!({
            "contents": [{
                "parts": [
                    {"text": prompt},
                    {
                        "inline_data": {
                            "mime_type": mime_type,
                            "data": BASE64.encode(media)
                        }
                    }
                ]
            }]
        });

        let res_json =
            post_json(&self.http_client, &self.endpoint(GEMINI_MEDIA_MODEL), &body).await?;
        extract_text_content(
            &res_json,
            &["candidates", "0", "content", "parts", "0", "text"],
        )
    }
}

#[async_trait]
impl NarrativeBackend for GeminiClient {
    async fn describe_media(&self, media: &[u8], kind: MediaKind) -> Result<String, ServiceError> {
        self.narrate_media(media, kind).await
    }
}
