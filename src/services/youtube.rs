//! YouTube Data API adapter for video search.

use crate::config::YOUTUBE_MAX_RESULTS;
use crate::services::http::{create_http_client, get_json};
use crate::services::ServiceError;
use crate::utils::{format_count, truncate_with_ellipsis};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Maximum characters of a video description kept in the record
const DESCRIPTION_LIMIT: usize = 200;

/// Flat record for one search hit; fields copied from the upstream response
/// with explicit defaults for anything missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub description: String,
    pub published_at: String,
    pub thumbnail: String,
    /// View count rendered with K/M/B suffixes
    pub views: String,
    pub likes: String,
    pub comments: String,
}

impl VideoRecord {
    /// Watch-page URL for the video.
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://youtube.com/watch?v={}", self.video_id)
    }
}

#[derive(Debug, Deserialize, Default)]
struct SearchSnippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt", default)]
    published_at: String,
    #[serde(default)]
    thumbnails: Value,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: SearchItemId,
    #[serde(default)]
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize, Default)]
struct SearchItemId {
    #[serde(rename = "videoId", default)]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoStatistics {
    #[serde(rename = "viewCount", default)]
    view_count: String,
    #[serde(rename = "likeCount", default)]
    like_count: String,
    #[serde(rename = "commentCount", default)]
    comment_count: String,
}

#[derive(Debug, Deserialize)]
struct StatsItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(default)]
    items: Vec<StatsItem>,
}

/// Client for YouTube video search.
pub struct YouTubeClient {
    http_client: HttpClient,
    api_key: String,
}

impl YouTubeClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: create_http_client(),
            api_key,
        }
    }

    /// Searches for videos and enriches the top hits with view statistics.
    ///
    /// # Errors
    ///
    /// Returns a `ServiceError` on network failure, non-success status, or
    /// an unparseable response. Missing fields inside a hit never fail the
    /// call; they fall back to defaults.
    pub async fn search_videos(&self, query: &str) -> Result<Vec<VideoRecord>, ServiceError> {
        let max_results = YOUTUBE_MAX_RESULTS.to_string();
        let search_json = get_json(
            &self.http_client,
            &format!("{YOUTUBE_API_BASE}/search"),
            &[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", &max_results),
                ("order", "relevance"),
                ("key", &self.api_key),
            ],
        )
        .await?;

        let search: SearchResponse =
            serde_json::from_value(search_json).map_err(|e| ServiceError::Json(e.to_string()))?;

        if search.items.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = search
            .items
            .iter()
            .map(|item| item.id.video_id.as_str())
            .filter(|id| !id.is_empty())
            .collect();
        let stats = self.fetch_statistics(&ids).await?;

        let records = search
            .items
            .into_iter()
            .map(|item| {
                let statistics = stats
                    .items
                    .iter()
                    .find(|s| s.id == item.id.video_id)
                    .map(|s| &s.statistics);

                let thumbnail = item
                    .snippet
                    .thumbnails
                    .pointer("/medium/url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();

                VideoRecord {
                    video_id: item.id.video_id,
                    title: item.snippet.title,
                    channel: item.snippet.channel_title,
                    description: truncate_with_ellipsis(
                        &item.snippet.description,
                        DESCRIPTION_LIMIT,
                    ),
                    published_at: item.snippet.published_at,
                    thumbnail,
                    views: format_count_field(statistics.map(|s| s.view_count.as_str())),
                    likes: format_count_field(statistics.map(|s| s.like_count.as_str())),
                    comments: format_count_field(statistics.map(|s| s.comment_count.as_str())),
                }
            })
            .collect();

        Ok(records)
    }

    async fn fetch_statistics(&self, ids: &[&str]) -> Result<StatsResponse, ServiceError> {
        let joined = ids.join(",");
        let stats_json = get_json(
            &self.http_client,
            &format!("{YOUTUBE_API_BASE}/videos"),
            &[
                ("part", "statistics"),
                ("id", &joined),
                ("key", &self.api_key),
            ],
        )
        .await?;

        serde_json::from_value(stats_json).map_err(|e| ServiceError::Json(e.to_string()))
    }
}

fn format_count_field(raw: Option<&str>) -> String {
    raw.and_then(|v| v.parse::<u64>().ok())
        .map_or_else(|| "0".to_string(), format_count)
}
