//! Complaint image analysis via vision completion
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::clients::{CompletionBackend, CompletionRequest, UserContent};
use crate::models::{Category, ImageAnalysis, Priority};

const VISION_SYSTEM_PROMPT: &str = r#"You are an AI that analyzes images of civic complaints in Telangana, India.

Look at the image and identify:
1. Category: municipal or corruption
2. Subcategory for municipal: water, potholes, streetlights, trash, drainage, parks, construction, corpse
3. Objects visible in the image
4. Condition/severity of the issue
5. Emergency level based on visual cues

Respond with JSON:
{
  "category": "municipal" or "corruption",
  "subcategory": "specific subcategory or null",
  "confidence": 0.0-1.0,
  "description": "what you see in the image",
  "detectedObjects": ["list", "of", "objects"],
  "severity": "low", "medium", or "high",
  "isEmergency": boolean
}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteImageAnalysis {
    category: Option<String>,
    subcategory: Option<String>,
    confidence: Option<f32>,
    description: Option<String>,
    detected_objects: Option<Vec<String>>,
    severity: Option<String>,
    is_emergency: Option<bool>,
}

/// Suggests a category for an uploaded complaint photo.
///
/// Same degradation policy as text classification: any failure returns the
/// fixed fallback analysis rather than an error.
pub struct ImageAnalysisService {
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl ImageAnalysisService {
    pub fn new(backend: Option<Arc<dyn CompletionBackend>>) -> Self {
        Self { backend }
    }

    /// Analyze a base64-encoded image. `image_type` is the MIME type the
    /// upload was tagged with, e.g. `image/jpeg`.
    pub async fn analyze(&self, image_base64: &str, image_type: &str) -> ImageAnalysis {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return fallback_analysis(),
        };

        let request = CompletionRequest {
            system: VISION_SYSTEM_PROMPT.to_string(),
            user: UserContent::TextWithImage {
                text: "Analyze this civic complaint image and categorize it:".to_string(),
                image_data_url: format!("data:{};base64,{}", image_type, image_base64),
            },
            max_tokens: 500,
            temperature: 0.2,
        };

        let raw = match backend.complete(request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Remote image analysis failed, using fallback");
                return fallback_analysis();
            }
        };

        match serde_json::from_str::<RemoteImageAnalysis>(&raw) {
            Ok(remote) => ImageAnalysis {
                category: remote
                    .category
                    .as_deref()
                    .map(Category::parse)
                    .unwrap_or(Category::Municipal),
                subcategory: remote.subcategory,
                confidence: remote.confidence.unwrap_or(0.6),
                description: remote
                    .description
                    .unwrap_or_else(|| "Unable to analyze image content".to_string()),
                detected_objects: remote.detected_objects.unwrap_or_default(),
                severity: remote
                    .severity
                    .as_deref()
                    .map(Priority::parse)
                    .unwrap_or(Priority::Medium),
                is_emergency: remote.is_emergency.unwrap_or(false),
            },
            Err(err) => {
                warn!(error = %err, "Malformed image analysis reply, using fallback");
                fallback_analysis()
            }
        }
    }
}

fn fallback_analysis() -> ImageAnalysis {
    ImageAnalysis {
        category: Category::Municipal,
        subcategory: None,
        confidence: 0.5,
        description: "Unable to analyze image. Please select category manually.".to_string(),
        detected_objects: Vec::new(),
        severity: Priority::Medium,
        is_emergency: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FailingBackend;

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        async fn complete(&self, _request: CompletionRequest) -> anyhow::Result<String> {
            Err(anyhow!("timed out"))
        }
    }

    struct CannedBackend(String);

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn complete(&self, request: CompletionRequest) -> anyhow::Result<String> {
            // The image must travel as a data URL content part.
            match request.user {
                UserContent::TextWithImage { image_data_url, .. } => {
                    assert!(image_data_url.starts_with("data:image/jpeg;base64,"));
                }
                UserContent::Text(_) => panic!("expected image content"),
            }
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn remote_failure_returns_fixed_fallback() {
        let service = ImageAnalysisService::new(Some(Arc::new(FailingBackend)));
        let analysis = service.analyze("AAAA", "image/jpeg").await;
        assert_eq!(analysis, fallback_analysis());
        assert_eq!(analysis.confidence, 0.5);
        assert!(!analysis.is_emergency);
    }

    #[tokio::test]
    async fn missing_backend_returns_fixed_fallback() {
        let service = ImageAnalysisService::new(None);
        let analysis = service.analyze("AAAA", "image/png").await;
        assert_eq!(
            analysis.description,
            "Unable to analyze image. Please select category manually."
        );
    }

    #[tokio::test]
    async fn remote_answer_is_mapped_through() {
        let remote = r#"{
            "category": "municipal",
            "subcategory": "potholes",
            "confidence": 0.85,
            "description": "A deep pothole filled with water",
            "detectedObjects": ["road", "pothole", "water"],
            "severity": "high",
            "isEmergency": true
        }"#;
        let service = ImageAnalysisService::new(Some(Arc::new(CannedBackend(remote.to_string()))));
        let analysis = service.analyze("AAAA", "image/jpeg").await;
        assert_eq!(analysis.subcategory.as_deref(), Some("potholes"));
        assert_eq!(analysis.confidence, 0.85);
        assert_eq!(analysis.severity, Priority::High);
        assert!(analysis.is_emergency);
        assert_eq!(analysis.detected_objects.len(), 3);
    }

    #[tokio::test]
    async fn partial_remote_answer_fills_defaults() {
        let remote = r#"{"category": "municipal", "subcategory": "trash"}"#;
        let service = ImageAnalysisService::new(Some(Arc::new(CannedBackend(remote.to_string()))));
        let analysis = service.analyze("AAAA", "image/jpeg").await;
        assert_eq!(analysis.confidence, 0.6);
        assert_eq!(analysis.description, "Unable to analyze image content");
        assert_eq!(analysis.severity, Priority::Medium);
        assert!(analysis.detected_objects.is_empty());
    }

    #[tokio::test]
    async fn non_json_reply_returns_fixed_fallback() {
        let service = ImageAnalysisService::new(Some(Arc::new(CannedBackend(
            "I see a road with a pothole.".to_string(),
        ))));
        let analysis = service.analyze("AAAA", "image/jpeg").await;
        assert_eq!(analysis, fallback_analysis());
    }
}
