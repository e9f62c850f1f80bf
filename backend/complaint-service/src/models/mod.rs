use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level complaint category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Municipal services (water, roads, waste, drainage, ...)
    Municipal,
    /// Corruption and governance complaints
    Corruption,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Municipal => "municipal",
            Category::Corruption => "corruption",
        }
    }

    /// Parse a stored category value. Unknown values map to `Municipal`,
    /// the catch-all the classifier itself defaults to.
    pub fn parse(s: &str) -> Self {
        match s {
            "corruption" => Category::Corruption,
            _ => Category::Municipal,
        }
    }
}

/// Complaint priority level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

/// Lifecycle status of an issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Submitted, awaiting review
    Reported,
    /// Picked up by the responsible department
    InProgress,
    /// Fixed or otherwise closed
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Reported => "reported",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "in_progress" => IssueStatus::InProgress,
            "resolved" => IssueStatus::Resolved,
            _ => IssueStatus::Reported,
        }
    }

    /// Strict variant for client-supplied values, where a typo must be
    /// rejected rather than silently mapped to `Reported`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "reported" => Some(IssueStatus::Reported),
            "in_progress" => Some(IssueStatus::InProgress),
            "resolved" => Some(IssueStatus::Resolved),
            _ => None,
        }
    }
}

/// A citizen-submitted civic issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub subcategory: Option<String>,
    pub location: Option<String>,
    pub priority: Priority,
    pub status: IssueStatus,
    pub image_url: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A proposed resolution for an issue, likeable by other citizens.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Suggestion {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of classifying complaint text. Ephemeral: surfaced to the client
/// as a form suggestion and never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub confidence: f32,
    pub priority: Priority,
    pub reasoning: String,
}

/// Result of analyzing an uploaded complaint image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub confidence: f32,
    pub description: String,
    pub detected_objects: Vec<String>,
    pub severity: Priority,
    pub is_emergency: bool,
}

/// Steps of the guided complaint-reporting dialog, in order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceStep {
    Start,
    Category,
    Description,
    Location,
    Priority,
    Submission,
}

impl GuidanceStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuidanceStep::Start => "start",
            GuidanceStep::Category => "category",
            GuidanceStep::Description => "description",
            GuidanceStep::Location => "location",
            GuidanceStep::Priority => "priority",
            GuidanceStep::Submission => "submission",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "start" => Some(GuidanceStep::Start),
            "category" => Some(GuidanceStep::Category),
            "description" => Some(GuidanceStep::Description),
            "location" => Some(GuidanceStep::Location),
            "priority" => Some(GuidanceStep::Priority),
            "submission" => Some(GuidanceStep::Submission),
            _ => None,
        }
    }

    /// Position in the forward-only dialog flow.
    pub fn position(&self) -> u8 {
        match self {
            GuidanceStep::Start => 0,
            GuidanceStep::Category => 1,
            GuidanceStep::Description => 2,
            GuidanceStep::Location => 3,
            GuidanceStep::Priority => 4,
            GuidanceStep::Submission => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GuidanceStep::Submission)
    }
}

/// Accumulated dialog state, keyed by the step at which each answer was
/// given. Passed explicitly between turns; the server holds no session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub struct GuidanceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl GuidanceContext {
    /// Record the user's answer under the step it was given at.
    pub fn record(&mut self, step: GuidanceStep, input: &str) {
        let slot = match step {
            GuidanceStep::Start => &mut self.start,
            GuidanceStep::Category => &mut self.category,
            GuidanceStep::Description => &mut self.description,
            GuidanceStep::Location => &mut self.location,
            GuidanceStep::Priority => &mut self.priority,
            GuidanceStep::Submission => return,
        };
        *slot = Some(input.to_string());
    }
}

/// One turn of the guided dialog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guidance {
    pub message: String,
    pub suggested_actions: Vec<String>,
    pub next_step: GuidanceStep,
    pub context: GuidanceContext,
}

/// Chatbot reply with its conversation handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
}

/// Per-category issue count used in chatbot summaries.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Aggregated view of one user's complaint history.
#[derive(Debug, Clone, Serialize, Default)]
pub struct UserComplaintStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
    /// Counts bucketed by subcategory (falling back to category).
    pub category_counts: Vec<CategoryCount>,
    pub recent_issue: Option<Issue>,
    /// Newest pending issues, at most three.
    pub pending_recent: Vec<Issue>,
    /// Newest resolved issues, at most three.
    pub resolved_recent: Vec<Issue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_storage_form() {
        for category in [Category::Municipal, Category::Corruption] {
            assert_eq!(Category::parse(category.as_str()), category);
        }
        // Unknown stored values fall back to the municipal catch-all.
        assert_eq!(Category::parse("garbage-in"), Category::Municipal);
    }

    #[test]
    fn priority_round_trips_and_orders() {
        for priority in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::parse(priority.as_str()), priority);
        }
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::parse("unknown"), Priority::Medium);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&IssueStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(IssueStatus::parse("in_progress"), IssueStatus::InProgress);
        assert_eq!(IssueStatus::parse("bogus"), IssueStatus::Reported);
    }

    #[test]
    fn strict_status_parse_rejects_unknown_values() {
        assert_eq!(IssueStatus::from_str("resolved"), Some(IssueStatus::Resolved));
        assert_eq!(IssueStatus::from_str("resolvd"), None);
        assert_eq!(IssueStatus::from_str(""), None);
    }

    #[test]
    fn guidance_steps_are_forward_ordered() {
        let steps = [
            GuidanceStep::Start,
            GuidanceStep::Category,
            GuidanceStep::Description,
            GuidanceStep::Location,
            GuidanceStep::Priority,
            GuidanceStep::Submission,
        ];
        for pair in steps.windows(2) {
            assert!(pair[0].position() < pair[1].position());
        }
        assert!(GuidanceStep::Submission.is_terminal());
        assert_eq!(GuidanceStep::from_str("category"), Some(GuidanceStep::Category));
        assert_eq!(GuidanceStep::from_str("cancel"), None);
    }

    #[test]
    fn context_records_answer_under_current_step() {
        let mut context = GuidanceContext::default();
        context.record(GuidanceStep::Start, "Municipal issue");
        context.record(GuidanceStep::Description, "Deep pothole on 5th street");
        assert_eq!(context.start.as_deref(), Some("Municipal issue"));
        assert_eq!(
            context.description.as_deref(),
            Some("Deep pothole on 5th street")
        );
        assert!(context.category.is_none());

        // Terminal step has no slot; recording there is a no-op.
        context.record(GuidanceStep::Submission, "ignored");
        assert_eq!(context, GuidanceContext {
            start: Some("Municipal issue".into()),
            description: Some("Deep pothole on 5th street".into()),
            ..Default::default()
        });
    }

    #[test]
    fn context_omits_empty_slots_on_the_wire() {
        let mut context = GuidanceContext::default();
        context.record(GuidanceStep::Category, "water problem");
        let value = serde_json::to_value(&context).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "category": "water problem" })
        );
    }

    #[test]
    fn image_analysis_uses_camel_case_keys() {
        let analysis = ImageAnalysis {
            category: Category::Municipal,
            subcategory: Some("potholes".into()),
            confidence: 0.8,
            description: "A damaged road surface".into(),
            detected_objects: vec!["road".into(), "pothole".into()],
            severity: Priority::Medium,
            is_emergency: false,
        };
        let value = serde_json::to_value(&analysis).unwrap();
        assert!(value.get("detectedObjects").is_some());
        assert!(value.get("isEmergency").is_some());
        assert!(value.get("detected_objects").is_none());
    }
}
