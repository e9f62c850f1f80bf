//! Complaint text classification
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clients::{CompletionBackend, CompletionRequest, UserContent};
use crate::models::{Category, ClassificationResult, Priority};

/// Phrases that force `high` priority when found in the complaint text.
const EMERGENCY_KEYWORDS: &[&str] = &[
    "accident",
    "dead body",
    "fire",
    "explosion",
    "gas leak",
    "heavy water leakage",
    "collapsed building",
    "electric shock",
    "flooding",
    "burst pipe",
    "sewage overflow",
    "injured",
    "emergency",
    "urgent",
    "life threatening",
    "blocked ambulance",
    "traffic jam ambulance",
    "broken streetlight night",
    "deep pothole accident",
];

/// Phrases that force at least `medium` priority.
const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    "no water supply",
    "power outage",
    "road blockage",
    "bridge damage",
    "signal not working",
    "damaged footpath",
    "overflowing drain",
];

const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are an AI classifier for civic complaints in Telangana, India.

Categories and subcategories:
- municipal: water, potholes, streetlights, trash, drainage, parks, construction, corpse
- corruption: bribery, misuse of power, illegal activities

Emergency indicators (HIGH priority): accident, dead body, fire, explosion, gas leak, heavy water leakage, collapsed building, electric shock, flooding, burst pipe, sewage overflow, injured, life threatening
High priority indicators (MEDIUM priority): no water supply, power outage, road blockage, bridge damage, signal not working

Analyze the text and respond with JSON:
{
  "category": "municipal" or "corruption",
  "subcategory": "specific subcategory",
  "priority": "low", "medium", or "high",
  "confidence": 0.0-1.0,
  "reasoning": "brief explanation"
}"#;

/// Remote reply, parsed defensively: every field optional so a partial
/// answer still contributes what it can.
#[derive(Debug, Deserialize)]
struct RemoteClassification {
    category: Option<String>,
    subcategory: Option<String>,
    priority: Option<String>,
    confidence: Option<f32>,
    reasoning: Option<String>,
}

/// Classifies complaint text into category, subcategory, and priority.
///
/// Prefers the remote completion backend when one is configured; any remote
/// failure (network, HTTP error, malformed JSON) degrades to a local keyword
/// table. Emergency keywords escalate priority on both paths.
pub struct ClassifierService {
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl ClassifierService {
    pub fn new(backend: Option<Arc<dyn CompletionBackend>>) -> Self {
        Self { backend }
    }

    /// Classify a complaint. Never fails: every error path lands on the
    /// keyword fallback.
    pub async fn classify(
        &self,
        title: &str,
        description: &str,
        check_emergency: bool,
    ) -> ClassificationResult {
        let combined = format!("{} {}", title, description).to_lowercase();
        let has_emergency = check_emergency && contains_any(&combined, EMERGENCY_KEYWORDS);
        let has_high_priority = contains_any(&combined, HIGH_PRIORITY_KEYWORDS);

        let remote = match &self.backend {
            Some(backend) => {
                self.classify_remote(backend.as_ref(), title, description)
                    .await
            }
            None => None,
        };

        match remote {
            Some(remote) => {
                let priority = if has_emergency {
                    Priority::High
                } else if has_high_priority {
                    Priority::Medium
                } else {
                    remote
                        .priority
                        .as_deref()
                        .map(Priority::parse)
                        .unwrap_or(Priority::Medium)
                };

                ClassificationResult {
                    category: remote
                        .category
                        .as_deref()
                        .map(Category::parse)
                        .unwrap_or(Category::Municipal),
                    subcategory: remote.subcategory,
                    confidence: remote.confidence.unwrap_or(0.7),
                    priority,
                    reasoning: remote
                        .reasoning
                        .unwrap_or_else(|| "AI-based classification".to_string()),
                }
            }
            None => fallback_classification(&combined, has_emergency, has_high_priority),
        }
    }

    async fn classify_remote(
        &self,
        backend: &dyn CompletionBackend,
        title: &str,
        description: &str,
    ) -> Option<RemoteClassification> {
        let request = CompletionRequest {
            system: CLASSIFY_SYSTEM_PROMPT.to_string(),
            user: UserContent::Text(format!(
                "Classify this complaint: \"{}. {}\"",
                title, description
            )),
            max_tokens: 300,
            temperature: 0.3,
        };

        let raw = match backend.complete(request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Remote classification failed, using keyword fallback");
                return None;
            }
        };

        match serde_json::from_str::<RemoteClassification>(&raw) {
            Ok(parsed) => {
                debug!(category = ?parsed.category, "Remote classification parsed");
                Some(parsed)
            }
            Err(err) => {
                warn!(error = %err, "Malformed classification reply, using keyword fallback");
                None
            }
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Keyword-table classification used when no backend is configured or the
/// remote call fails. `text` must already be lower-cased.
fn fallback_classification(
    text: &str,
    has_emergency: bool,
    has_high_priority: bool,
) -> ClassificationResult {
    let mut category = Category::Municipal;
    let mut subcategory = "other";

    if text.contains("water") || text.contains("supply") || text.contains("pipe") {
        subcategory = "water";
    } else if text.contains("road") || text.contains("pothole") || text.contains("street") {
        subcategory = "potholes";
    } else if text.contains("light") || text.contains("street light") || text.contains("lamp") {
        subcategory = "streetlights";
    } else if text.contains("garbage") || text.contains("waste") || text.contains("trash") {
        subcategory = "trash";
    } else if text.contains("drain") || text.contains("sewage") || text.contains("drainage") {
        subcategory = "drainage";
    } else if text.contains("bribe") || text.contains("corrupt") || text.contains("money") {
        category = Category::Corruption;
    }

    let priority = if has_emergency {
        Priority::High
    } else if has_high_priority {
        Priority::Medium
    } else {
        Priority::Medium
    };

    ClassificationResult {
        category,
        subcategory: Some(subcategory.to_string()),
        confidence: 0.6,
        priority,
        reasoning: "Keyword-based fallback classification".to_string(),
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
            Err(anyhow!("connection refused"))
        }
    }

    struct CannedBackend(String);

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn complete(&self, _request: CompletionRequest) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }
    }

    fn service_without_backend() -> ClassifierService {
        ClassifierService::new(None)
    }

    #[tokio::test]
    async fn emergency_keyword_forces_high_priority_on_fallback_path() {
        let service = ClassifierService::new(Some(Arc::new(FailingBackend)));
        let result = service
            .classify("Dead body near market", "Found this morning, needs removal", true)
            .await;
        assert_eq!(result.priority, Priority::High);
        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.reasoning, "Keyword-based fallback classification");
    }

    #[tokio::test]
    async fn emergency_keyword_forces_high_priority_over_remote_answer() {
        let remote = r#"{"category":"municipal","subcategory":"corpse","priority":"low","confidence":0.9,"reasoning":"routine"}"#;
        let service = ClassifierService::new(Some(Arc::new(CannedBackend(remote.to_string()))));
        let result = service
            .classify("Dead body near market", "Please send someone", true)
            .await;
        assert_eq!(result.priority, Priority::High);
        assert_eq!(result.subcategory.as_deref(), Some("corpse"));
        assert_eq!(result.confidence, 0.9);
    }

    #[tokio::test]
    async fn high_priority_keyword_forces_medium() {
        let service = service_without_backend();
        let result = service
            .classify("No water supply today", "Entire colony affected since morning", true)
            .await;
        assert_eq!(result.priority, Priority::Medium);
        // "water" substring also drives the subcategory guess.
        assert_eq!(result.subcategory.as_deref(), Some("water"));
    }

    #[tokio::test]
    async fn check_emergency_false_skips_escalation() {
        let service = service_without_backend();
        let result = service
            .classify("Fire drill report", "Scheduled fire safety drill", false)
            .await;
        assert_eq!(result.priority, Priority::Medium);
    }

    #[tokio::test]
    async fn malformed_remote_reply_degrades_to_fallback() {
        let service = ClassifierService::new(Some(Arc::new(CannedBackend(
            "Sorry, I cannot answer that.".to_string(),
        ))));
        let result = service
            .classify("Garbage pileup", "Trash not collected for a week", true)
            .await;
        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.subcategory.as_deref(), Some("trash"));
        assert_eq!(result.reasoning, "Keyword-based fallback classification");
    }

    #[tokio::test]
    async fn remote_answer_merges_with_defaults() {
        // Partial remote reply: missing confidence and reasoning.
        let remote = r#"{"category":"corruption","subcategory":"bribery","priority":"high"}"#;
        let service = ClassifierService::new(Some(Arc::new(CannedBackend(remote.to_string()))));
        let result = service
            .classify("Officer demanding payment", "Asked for extra fees at the office", true)
            .await;
        assert_eq!(result.category, Category::Corruption);
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.reasoning, "AI-based classification");
        assert_eq!(result.priority, Priority::High);
    }

    #[test]
    fn fallback_maps_keywords_to_subcategories() {
        let cases = [
            ("broken pipe leaking", "water"),
            ("huge pothole on main road", "potholes"),
            ("lamp not working", "streetlights"),
            ("garbage everywhere", "trash"),
            ("sewage smell in colony", "drainage"),
        ];
        for (text, expected) in cases {
            let result = fallback_classification(text, false, false);
            assert_eq!(result.subcategory.as_deref(), Some(expected), "text: {text}");
            assert_eq!(result.category, Category::Municipal);
        }
    }

    #[test]
    fn fallback_detects_corruption() {
        let result = fallback_classification("official asked for a bribe", false, false);
        assert_eq!(result.category, Category::Corruption);
        assert_eq!(result.subcategory.as_deref(), Some("other"));
    }

    #[test]
    fn fallback_rule_order_prefers_water_over_roads() {
        // "supply" matches the water rule before the road rule is considered.
        let result = fallback_classification("supply truck damaged the road", false, false);
        assert_eq!(result.subcategory.as_deref(), Some("water"));
    }
}
