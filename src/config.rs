//! Configuration and settings management
//!
//! Loads settings from environment variables and defines service constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// How the bot receives updates from Telegram.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Long polling (development default)
    #[default]
    Polling,
    /// Webhook listener behind a public URL
    Webhook,
}

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_bot_token: String,

    /// Gemini API key (text generation and media narration)
    pub gemini_api_key: String,
    /// YouTube Data API key
    pub youtube_api_key: String,
    /// TMDB API key
    pub tmdb_api_key: String,
    /// remove.bg API key
    pub removebg_api_key: String,
    /// Google Vision API key; structured vision is skipped when unset
    pub google_vision_api_key: Option<String>,

    /// Update transport selection
    #[serde(default)]
    pub transport: TransportMode,
    /// Public base URL for webhook mode
    pub webhook_url: Option<String>,
    /// Listen port for webhook mode
    #[serde(default = "default_port")]
    pub port: u16,
}

const fn default_port() -> u16 {
    5000
}

impl Settings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a required credential is absent or if
    /// webhook mode is selected without a `WEBHOOK_URL`.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case;
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;

        if settings.transport == TransportMode::Webhook && settings.webhook_url.is_none() {
            return Err(ConfigError::Message(
                "WEBHOOK_URL is required when transport=webhook".to_string(),
            ));
        }

        Ok(settings)
    }

    /// Whether the structured-vision backend is configured.
    #[must_use]
    pub fn vision_enabled(&self) -> bool {
        self.google_vision_api_key.is_some()
    }
}

/// HTTP timeout for upstream API calls, `HTTP_TIMEOUT_SECS` env or 30s default
#[must_use]
pub fn get_http_timeout_secs() -> u64 {
    std::env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30)
}

/// Maximum accepted upload size for photos and videos (20MB)
pub const MAX_UPLOAD_BYTES: u32 = 20 * 1024 * 1024;

/// Number of results returned by YouTube search
pub const YOUTUBE_MAX_RESULTS: usize = 5;

/// Hard character budget for analysis replies before the ellipsis marker
pub const ANALYSIS_CHAR_BUDGET: usize = 3800;

/// Gemini model for plain text chat
pub const GEMINI_TEXT_MODEL: &str = "gemini-2.5-flash";
/// Gemini model for image and video narration
pub const GEMINI_MEDIA_MODEL: &str = "gemini-2.5-pro";

/// Fixed multi-point prompt for image narration
pub const IMAGE_ANALYSIS_PROMPT: &str = "Analyze this image thoroughly and provide detailed information about:\n\
    - What objects, people, or scenes you can see\n\
    - Any text that might be visible\n\
    - The setting, mood, or context\n\
    - Any notable features, colors, or composition elements\n\
    - If applicable, identify any landmarks, brands, or recognizable elements";

/// Fixed multi-point prompt for video narration
pub const VIDEO_ANALYSIS_PROMPT: &str = "Analyze this video thoroughly and provide detailed information about:\n\
    - What objects, people, or scenes appear\n\
    - Any text or captions that might be visible\n\
    - The setting, mood, or context\n\
    - Any notable actions or events\n\
    - If applicable, identify any landmarks, brands, or recognizable elements";

// Telegram file-download retry parameters
/// Maximum retry attempts for Telegram file downloads
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff delay in milliseconds
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff delay in milliseconds
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

#[cfg(test)]
mod tests {
    use super::*;

    // Tests run with --test-threads=1 semantics per variable; each test uses
    // distinct env vars to avoid races.
    fn set_required_keys() {
        std::env::set_var("TELEGRAM_BOT_TOKEN", "dummy-token");
        std::env::set_var("GEMINI_API_KEY", "dummy");
        std::env::set_var("YOUTUBE_API_KEY", "dummy");
        std::env::set_var("TMDB_API_KEY", "dummy");
        std::env::set_var("REMOVEBG_API_KEY", "dummy");
    }

    fn clear_all() {
        for key in [
            "TELEGRAM_BOT_TOKEN",
            "GEMINI_API_KEY",
            "YOUTUBE_API_KEY",
            "TMDB_API_KEY",
            "REMOVEBG_API_KEY",
            "GOOGLE_VISION_API_KEY",
            "TRANSPORT",
            "WEBHOOK_URL",
        ] {
            std::env::remove_var(key);
        }
    }

    // Single test because the cases share process-wide env vars.
    #[test]
    fn test_env_loading() {
        clear_all();

        // A missing required credential must fail startup, not default.
        assert!(Settings::new().is_err());

        set_required_keys();

        let settings = Settings::new().expect("settings should load");
        assert_eq!(settings.telegram_bot_token, "dummy-token");
        assert_eq!(settings.transport, TransportMode::Polling);
        assert_eq!(settings.port, 5000);
        assert!(!settings.vision_enabled());

        std::env::set_var("GOOGLE_VISION_API_KEY", "vision-key");
        let settings = Settings::new().expect("settings should load");
        assert!(settings.vision_enabled());

        // Webhook mode without a public URL must fail fast.
        std::env::set_var("TRANSPORT", "webhook");
        assert!(Settings::new().is_err());

        std::env::set_var("WEBHOOK_URL", "https://bot.example.com");
        let settings = Settings::new().expect("settings should load");
        assert_eq!(settings.transport, TransportMode::Webhook);

        clear_all();
    }

    #[test]
    fn test_http_timeout_override() {
        std::env::remove_var("HTTP_TIMEOUT_SECS");
        assert_eq!(get_http_timeout_secs(), 30);

        std::env::set_var("HTTP_TIMEOUT_SECS", "10");
        assert_eq!(get_http_timeout_secs(), 10);
        std::env::remove_var("HTTP_TIMEOUT_SECS");
    }
}
