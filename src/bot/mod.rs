//! Telegram-facing layer: command handlers, dialogue state, messaging helpers.

/// Command and message handlers
pub mod handlers;
/// Message splitting and sending helpers
pub mod messaging;
/// Per-conversation dialogue state
pub mod state;

use crate::analysis::{MediaAnalyzer, NarrativeBackend, StructuredVisionBackend};
use crate::config::Settings;
use crate::services::gemini::GeminiClient;
use crate::services::removebg::RemoveBgClient;
use crate::services::tmdb::TmdbClient;
use crate::services::vision::VisionClient;
use crate::services::youtube::YouTubeClient;
use std::sync::Arc;
use tracing::info;

/// All upstream adapters, constructed once at startup and shared across
/// handlers.
pub struct AppServices {
    pub gemini: Arc<GeminiClient>,
    pub youtube: YouTubeClient,
    pub tmdb: TmdbClient,
    pub removebg: RemoveBgClient,
    pub analyzer: MediaAnalyzer,
}

impl AppServices {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let gemini = Arc::new(GeminiClient::new(settings.gemini_api_key.clone()));

        let vision = settings.google_vision_api_key.clone().map(|key| {
            info!("Structured vision backend enabled.");
            Arc::new(VisionClient::new(key)) as Arc<dyn StructuredVisionBackend>
        });
        if vision.is_none() {
            info!("Structured vision backend not configured; media analysis will use the generative backend only.");
        }

        let analyzer = MediaAnalyzer::new(vision, gemini.clone() as Arc<dyn NarrativeBackend>);

        Self {
            gemini,
            youtube: YouTubeClient::new(settings.youtube_api_key.clone()),
            tmdb: TmdbClient::new(settings.tmdb_api_key.clone()),
            removebg: RemoveBgClient::new(settings.removebg_api_key.clone()),
            analyzer,
        }
    }
}
