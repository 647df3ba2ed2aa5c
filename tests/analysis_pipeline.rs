//! End-to-end tests for the media-analysis pipeline through the public API.

use async_trait::async_trait;
use omnibot::analysis::{
    AnalysisMode, AnalysisRequest, MediaAnalyzer, MediaKind, NarrativeBackend,
    StructuredVisionBackend, IMAGE_FALLBACK,
};
use omnibot::config::ANALYSIS_CHAR_BUDGET;
use omnibot::services::ServiceError;
use omnibot::utils::{sanitize_markup, truncate_with_ellipsis};
use std::sync::Arc;

struct ScriptedNarrative(Result<String, String>);

#[async_trait]
impl NarrativeBackend for ScriptedNarrative {
    async fn describe_media(&self, _media: &[u8], _kind: MediaKind) -> Result<String, ServiceError> {
        self.0.clone().map_err(ServiceError::Api)
    }
}

struct ScriptedVision(Result<Vec<String>, String>);

#[async_trait]
impl StructuredVisionBackend for ScriptedVision {
    async fn annotate(&self, _image: &[u8]) -> Result<Vec<String>, ServiceError> {
        self.0.clone().map_err(ServiceError::Network)
    }
}

fn image_request() -> AnalysisRequest {
    AnalysisRequest {
        media: vec![1, 2, 3],
        kind: MediaKind::Image,
        mode: AnalysisMode::Analyze,
    }
}

#[tokio::test]
async fn full_pipeline_merges_structured_and_narrative() {
    let analyzer = MediaAnalyzer::new(
        Some(Arc::new(ScriptedVision(Ok(vec![
            "Objects Detected: bridge, river".to_string(),
            "Landmarks: Golden Gate Bridge".to_string(),
        ])))),
        Arc::new(ScriptedNarrative(Ok(
            "A suspension bridge over a bay at sunset.".to_string()
        ))),
    );

    let out = analyzer.analyze(&image_request()).await;

    assert!(out.starts_with("Objects Detected: bridge, river"));
    assert!(out.contains("Landmarks: Golden Gate Bridge"));
    assert!(out.contains("AI Analysis:\nA suspension bridge over a bay at sunset."));
}

#[tokio::test]
async fn pipeline_survives_vision_outage() {
    let analyzer = MediaAnalyzer::new(
        Some(Arc::new(ScriptedVision(Err("503".to_string())))),
        Arc::new(ScriptedNarrative(Ok("Only the narrative.".to_string()))),
    );

    assert_eq!(
        analyzer.analyze(&image_request()).await,
        "Only the narrative."
    );
}

#[tokio::test]
async fn pipeline_total_failure_yields_canned_reply() {
    let analyzer = MediaAnalyzer::new(
        Some(Arc::new(ScriptedVision(Err("down".to_string())))),
        Arc::new(ScriptedNarrative(Err("down".to_string()))),
    );

    assert_eq!(analyzer.analyze(&image_request()).await, IMAGE_FALLBACK);
}

#[tokio::test]
async fn oversized_narrative_fits_reply_budget_after_formatting() {
    let long_story = format!("*header*\n{}", "word ".repeat(2000));
    let analyzer = MediaAnalyzer::new(None, Arc::new(ScriptedNarrative(Ok(long_story))));

    let raw = analyzer.analyze(&image_request()).await;
    let cleaned = sanitize_markup(&raw);
    let clipped = truncate_with_ellipsis(cleaned.trim(), ANALYSIS_CHAR_BUDGET);

    assert!(!clipped.contains('*'));
    assert!(clipped.ends_with("..."));
    assert!(clipped.chars().count() <= ANALYSIS_CHAR_BUDGET + 3);
}
