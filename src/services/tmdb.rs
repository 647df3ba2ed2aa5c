//! TMDB adapter for movie lookup.

use crate::services::http::{create_http_client, get_json};
use crate::services::ServiceError;
use crate::utils::format_currency;
use reqwest::Client as HttpClient;
use serde::Deserialize;

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Number of cast members kept in the record
const CAST_LIMIT: usize = 5;

/// Flat record for the best-matching movie; fields copied from the upstream
/// response with explicit defaults for anything missing.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub title: String,
    pub year: String,
    pub release_date: String,
    pub rating: f64,
    /// Runtime in minutes, `None` when TMDB has no value
    pub runtime: Option<u32>,
    pub genres: Vec<String>,
    pub overview: String,
    pub poster_url: Option<String>,
    pub cast: Vec<String>,
    pub director: String,
    /// Budget rendered with `$` and K/M/B suffixes, "Unknown" when absent
    pub budget: String,
    pub revenue: String,
    pub vote_count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize, Default)]
struct Genre {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct CastMember {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct CrewMember {
    #[serde(default)]
    name: String,
    #[serde(default)]
    job: String,
}

#[derive(Debug, Deserialize, Default)]
struct Credits {
    #[serde(default)]
    cast: Vec<CastMember>,
    #[serde(default)]
    crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize, Default)]
struct MovieDetails {
    #[serde(default)]
    title: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    runtime: Option<u32>,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    credits: Credits,
    #[serde(default)]
    budget: u64,
    #[serde(default)]
    revenue: u64,
    #[serde(default)]
    vote_count: u64,
}

/// Client for TMDB movie search and details.
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
}

impl TmdbClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: create_http_client(),
            api_key,
        }
    }

    /// Searches for a movie and returns the best match with full details,
    /// or `None` when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns a `ServiceError` on network failure, non-success status, or
    /// an unparseable response.
    pub async fn search_movie(&self, query: &str) -> Result<Option<MovieRecord>, ServiceError> {
        let search_json = get_json(
            &self.http_client,
            &format!("{TMDB_API_BASE}/search/movie"),
            &[
                ("api_key", self.api_key.as_str()),
                ("query", query),
                ("language", "en-US"),
                ("page", "1"),
                ("include_adult", "false"),
            ],
        )
        .await?;

        let search: SearchResponse =
            serde_json::from_value(search_json).map_err(|e| ServiceError::Json(e.to_string()))?;

        let Some(top) = search.results.first() else {
            return Ok(None);
        };

        let details_json = get_json(
            &self.http_client,
            &format!("{TMDB_API_BASE}/movie/{}", top.id),
            &[
                ("api_key", self.api_key.as_str()),
                ("language", "en-US"),
                ("append_to_response", "credits"),
            ],
        )
        .await?;

        let details: MovieDetails =
            serde_json::from_value(details_json).map_err(|e| ServiceError::Json(e.to_string()))?;

        Ok(Some(map_details(details)))
    }
}

fn map_details(details: MovieDetails) -> MovieRecord {
    let year = details
        .release_date
        .split('-')
        .next()
        .filter(|y| !y.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    let release_date = if details.release_date.is_empty() {
        "Unknown".to_string()
    } else {
        details.release_date.clone()
    };

    let director = details
        .credits
        .crew
        .iter()
        .find(|member| member.job == "Director")
        .map_or_else(|| "Unknown".to_string(), |member| member.name.clone());

    let cast = details
        .credits
        .cast
        .iter()
        .take(CAST_LIMIT)
        .map(|member| member.name.clone())
        .collect();

    let overview = if details.overview.is_empty() {
        "No overview available.".to_string()
    } else {
        details.overview
    };

    MovieRecord {
        title: if details.title.is_empty() {
            "Unknown Title".to_string()
        } else {
            details.title
        },
        year,
        release_date,
        rating: (details.vote_average * 10.0).round() / 10.0,
        runtime: details.runtime.filter(|r| *r > 0),
        genres: details.genres.into_iter().map(|g| g.name).collect(),
        overview,
        poster_url: details
            .poster_path
            .map(|path| format!("{TMDB_IMAGE_BASE}{path}")),
        cast,
        director,
        budget: format_amount(details.budget),
        revenue: format_amount(details.revenue),
        vote_count: details.vote_count,
    }
}

fn format_amount(amount: u64) -> String {
    if amount == 0 {
        "Unknown".to_string()
    } else {
        format_currency(amount)
    }
}
