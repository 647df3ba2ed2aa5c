//! Media-analysis aggregator.
//!
//! Combines the structured-vision adapter and the generative narration
//! adapter into a single human-readable analysis string, degrading through
//! a fallback chain instead of surfacing errors: structured + narrative
//! combined, narrative alone, then a fixed "unable to analyze" message.

use crate::services::ServiceError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Kind of uploaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Display label used in reply headings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Video => "Video",
        }
    }
}

/// What the user asked to do with the uploaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Describe the media
    Analyze,
    /// Strip the background (images only)
    RemoveBackground,
}

/// One inbound media message, discarded after the reply is sent.
pub struct AnalysisRequest {
    /// Raw media bytes, held in memory for the duration of one request
    pub media: Vec<u8>,
    pub kind: MediaKind,
    pub mode: AnalysisMode,
}

/// Outcome of one aggregation pass. Immutable once built.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Discrete labeled facts from the structured-vision backend
    pub structured_findings: Option<Vec<String>>,
    /// Free-text description from the generative backend
    pub narrative: Option<String>,
}

impl AnalysisResult {
    /// Merges the pieces into user-facing text; `None` when both are absent.
    ///
    /// When both exist the narrative follows the structured findings under
    /// a labeled heading.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match (&self.structured_findings, &self.narrative) {
            (Some(findings), Some(narrative)) => Some(format!(
                "{}\n\nAI Analysis:\n{}",
                findings.join("\n"),
                narrative
            )),
            (Some(findings), None) => Some(findings.join("\n")),
            (None, Some(narrative)) => Some(narrative.clone()),
            (None, None) => None,
        }
    }
}

/// Generative backend producing a free-text description of media bytes.
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    async fn describe_media(&self, media: &[u8], kind: MediaKind) -> Result<String, ServiceError>;
}

/// Structured annotation backend producing labeled findings for an image.
///
/// Implementations swallow per-detector failures internally; an `Err` means
/// the backend as a whole was unreachable.
#[async_trait]
pub trait StructuredVisionBackend: Send + Sync {
    async fn annotate(&self, image: &[u8]) -> Result<Vec<String>, ServiceError>;
}

/// Fixed fallback reply when every image backend failed.
pub const IMAGE_FALLBACK: &str = "Unable to analyze the image. Please try again later.";
/// Fixed fallback reply when video narration failed.
pub const VIDEO_FALLBACK: &str = "Unable to analyze the video. Please try again later.";

/// Aggregates structured findings and generative narration with fallback.
pub struct MediaAnalyzer {
    vision: Option<Arc<dyn StructuredVisionBackend>>,
    narrative: Arc<dyn NarrativeBackend>,
}

impl MediaAnalyzer {
    #[must_use]
    pub fn new(
        vision: Option<Arc<dyn StructuredVisionBackend>>,
        narrative: Arc<dyn NarrativeBackend>,
    ) -> Self {
        Self { vision, narrative }
    }

    /// Produces a single analysis string for the request. Never errors;
    /// total failure yields the fixed per-kind fallback message.
    pub async fn analyze(&self, request: &AnalysisRequest) -> String {
        match request.kind {
            MediaKind::Image => self.analyze_image(&request.media).await,
            MediaKind::Video => self.analyze_video(&request.media).await,
        }
    }

    async fn analyze_image(&self, media: &[u8]) -> String {
        if let Some(text) = self.combined_image_analysis(media).await {
            return text;
        }

        // The combined path already tried the narrative backend once, but a
        // transient failure there should not cost the user the whole reply.
        match self.narrative.describe_media(media, MediaKind::Image).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => IMAGE_FALLBACK.to_string(),
            Err(e) => {
                warn!("Fallback image narration failed: {e}");
                IMAGE_FALLBACK.to_string()
            }
        }
    }

    async fn analyze_video(&self, media: &[u8]) -> String {
        // The structured-vision backend has no video support.
        match self.narrative.describe_media(media, MediaKind::Video).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => VIDEO_FALLBACK.to_string(),
            Err(e) => {
                warn!("Video narration failed: {e}");
                VIDEO_FALLBACK.to_string()
            }
        }
    }

    /// Runs both image backends concurrently and merges their results.
    /// `None` when vision is unconfigured or both attempts came back empty.
    async fn combined_image_analysis(&self, media: &[u8]) -> Option<String> {
        let vision = self.vision.as_ref()?;

        let (findings, narrative) = tokio::join!(
            vision.annotate(media),
            self.narrative.describe_media(media, MediaKind::Image)
        );

        let structured_findings = match findings {
            Ok(lines) if !lines.is_empty() => Some(lines),
            Ok(_) => None,
            Err(e) => {
                warn!("Structured vision annotation failed: {e}");
                None
            }
        };
        let narrative = match narrative {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!("Image narration failed: {e}");
                None
            }
        };

        AnalysisResult {
            structured_findings,
            narrative,
        }
        .render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedNarrative {
        response: Result<String, ()>,
        calls: AtomicUsize,
    }

    impl FixedNarrative {
        fn ok(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NarrativeBackend for FixedNarrative {
        async fn describe_media(
            &self,
            _media: &[u8],
            _kind: MediaKind,
        ) -> Result<String, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .map_err(|()| ServiceError::Api("narration down".to_string()))
        }
    }

    struct FixedVision {
        response: Result<Vec<String>, ()>,
    }

    #[async_trait]
    impl StructuredVisionBackend for FixedVision {
        async fn annotate(&self, _image: &[u8]) -> Result<Vec<String>, ServiceError> {
            self.response
                .clone()
                .map_err(|()| ServiceError::Network("vision down".to_string()))
        }
    }

    fn image_request() -> AnalysisRequest {
        AnalysisRequest {
            media: vec![0u8; 16],
            kind: MediaKind::Image,
            mode: AnalysisMode::Analyze,
        }
    }

    #[tokio::test]
    async fn test_both_backends_succeed_narrative_after_structured() {
        let analyzer = MediaAnalyzer::new(
            Some(Arc::new(FixedVision {
                response: Ok(vec![
                    "Objects Detected: cat, sofa".to_string(),
                    "Faces Detected: 1".to_string(),
                ]),
            })),
            Arc::new(FixedNarrative::ok("A cat lounging on a sofa.")),
        );

        let out = analyzer.analyze(&image_request()).await;
        let structured_pos = out
            .find("Objects Detected: cat, sofa")
            .expect("structured findings present");
        let narrative_pos = out
            .find("A cat lounging on a sofa.")
            .expect("narrative present");
        assert!(out.contains("Faces Detected: 1"));
        assert!(out.contains("AI Analysis:"));
        assert!(structured_pos < narrative_pos);
    }

    #[tokio::test]
    async fn test_vision_failure_degrades_to_narrative_only() {
        let analyzer = MediaAnalyzer::new(
            Some(Arc::new(FixedVision { response: Err(()) })),
            Arc::new(FixedNarrative::ok("Just the description.")),
        );

        let out = analyzer.analyze(&image_request()).await;
        assert_eq!(out, "Just the description.");
    }

    #[tokio::test]
    async fn test_both_backends_fail_yields_fixed_fallback() {
        let analyzer = MediaAnalyzer::new(
            Some(Arc::new(FixedVision { response: Err(()) })),
            Arc::new(FixedNarrative::failing()),
        );

        let out = analyzer.analyze(&image_request()).await;
        assert_eq!(out, IMAGE_FALLBACK);
    }

    #[tokio::test]
    async fn test_vision_unconfigured_uses_narrative_alone() {
        let narrative = Arc::new(FixedNarrative::ok("Narrative only."));
        let analyzer = MediaAnalyzer::new(None, narrative.clone());

        let out = analyzer.analyze(&image_request()).await;
        assert_eq!(out, "Narrative only.");
        assert_eq!(narrative.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_structured_only_when_narrative_empty() {
        let analyzer = MediaAnalyzer::new(
            Some(Arc::new(FixedVision {
                response: Ok(vec!["Logos: Acme".to_string()]),
            })),
            Arc::new(FixedNarrative::ok("   ")),
        );

        let out = analyzer.analyze(&image_request()).await;
        assert_eq!(out, "Logos: Acme");
    }

    #[tokio::test]
    async fn test_video_skips_vision_and_falls_back() {
        let analyzer = MediaAnalyzer::new(
            Some(Arc::new(FixedVision { response: Err(()) })),
            Arc::new(FixedNarrative::failing()),
        );

        let request = AnalysisRequest {
            media: vec![0u8; 16],
            kind: MediaKind::Video,
            mode: AnalysisMode::Analyze,
        };
        assert_eq!(analyzer.analyze(&request).await, VIDEO_FALLBACK);
    }

    #[tokio::test]
    async fn test_video_narration_success() {
        let analyzer = MediaAnalyzer::new(None, Arc::new(FixedNarrative::ok("Clip of a street.")));
        let request = AnalysisRequest {
            media: vec![0u8; 16],
            kind: MediaKind::Video,
            mode: AnalysisMode::Analyze,
        };
        assert_eq!(analyzer.analyze(&request).await, "Clip of a street.");
    }

    #[test]
    fn test_render_empty_result() {
        assert_eq!(AnalysisResult::default().render(), None);
    }
}
