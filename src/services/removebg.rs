//! remove.bg adapter for image background removal.

use crate::services::http::{api_error, create_http_client};
use crate::services::ServiceError;
use reqwest::multipart::{Form, Part};
use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use tracing::info;

const REMOVEBG_API_URL: &str = "https://api.remove.bg/v1.0/removebg";

/// Client for the remove.bg background-removal endpoint.
pub struct RemoveBgClient {
    http_client: HttpClient,
    api_key: String,
}

impl RemoveBgClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: create_http_client(),
            api_key,
        }
    }

    /// Removes the background from an image, returning PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidImageFormat` on HTTP 400,
    /// `ServiceError::QuotaExceeded` on HTTP 402, `ServiceError::Api` on
    /// other non-success statuses, or `ServiceError::Network` on
    /// connectivity failures.
    pub async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, ServiceError> {
        let form = Form::new()
            .part("image_file", Part::bytes(image.to_vec()).file_name("image"))
            .text("size", "auto")
            .text("format", "png")
            .text("type", "auto");

        let response = self
            .http_client
            .post(REMOVEBG_API_URL)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::BAD_REQUEST => return Err(ServiceError::InvalidImageFormat),
            StatusCode::PAYMENT_REQUIRED => return Err(ServiceError::QuotaExceeded),
            status if !status.is_success() => return Err(api_error(response).await),
            _ => {}
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        info!("Background removed, {} result bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}
