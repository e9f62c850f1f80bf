//! Step-by-step complaint reporting dialog
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::clients::{CompletionBackend, CompletionRequest, UserContent};
use crate::models::{Guidance, GuidanceContext, GuidanceStep};

const GUIDANCE_SYSTEM_PROMPT: &str = r#"You are a helpful AI assistant for the Civic Crowdsourced Reporting System in Telangana.

Your role is to guide users through reporting civic complaints step by step. Be conversational, helpful, and specific to Telangana's civic issues.

Steps flow:
1. start -> category selection
2. category -> detailed description
3. description -> location gathering
4. location -> priority assessment
5. priority -> submission

Categories:
- Municipal issues: water supply, roads/potholes, streetlights, waste management, drainage, parks, construction issues, corpse removal
- Political corruption: bribery, misuse of power, illegal activities

Always respond in JSON format:
{
  "message": "conversational response to user",
  "suggestedActions": ["action1", "action2", "action3"],
  "nextStep": "next step name"
}

Be encouraging and make the process feel simple. Use local context for Telangana when relevant."#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteGuidance {
    message: Option<String>,
    suggested_actions: Option<Vec<String>>,
    next_step: Option<String>,
}

/// Drives the guided complaint dialog: one call per turn, forward-only.
///
/// The dialog state lives entirely in the `GuidanceContext` the caller passes
/// back on each turn; the service holds no session.
pub struct GuidanceService {
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl GuidanceService {
    pub fn new(backend: Option<Arc<dyn CompletionBackend>>) -> Self {
        Self { backend }
    }

    /// Produce the next dialog turn. The user's answer (if any) is recorded
    /// in the context under the current step before the reply is computed.
    pub async fn advise(
        &self,
        step: GuidanceStep,
        user_input: Option<&str>,
        mut context: GuidanceContext,
    ) -> Guidance {
        if let Some(input) = user_input.map(str::trim).filter(|s| !s.is_empty()) {
            context.record(step, input);
        }

        let remote = match &self.backend {
            Some(backend) => {
                self.advise_remote(backend.as_ref(), step, user_input, &context)
                    .await
            }
            None => None,
        };

        match remote {
            Some(remote) if remote.message.is_some() => {
                let next_step = remote
                    .next_step
                    .as_deref()
                    .and_then(GuidanceStep::from_str)
                    // Backward or unknown transitions are clamped to the
                    // canonical successor; the dialog only moves forward.
                    .filter(|next| next.position() > step.position())
                    .unwrap_or_else(|| successor(step));

                Guidance {
                    message: remote.message.unwrap_or_default(),
                    suggested_actions: remote.suggested_actions.unwrap_or_default(),
                    next_step,
                    context,
                }
            }
            _ => fallback_guidance(step, context),
        }
    }

    async fn advise_remote(
        &self,
        backend: &dyn CompletionBackend,
        step: GuidanceStep,
        user_input: Option<&str>,
        context: &GuidanceContext,
    ) -> Option<RemoteGuidance> {
        let context_json = serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string());
        let request = CompletionRequest {
            system: GUIDANCE_SYSTEM_PROMPT.to_string(),
            user: UserContent::Text(format!(
                "Current step: {}. User input: \"{}\". Context: {}. Provide guidance.",
                step.as_str(),
                user_input.unwrap_or("None"),
                context_json
            )),
            max_tokens: 400,
            temperature: 0.7,
        };

        let raw = match backend.complete(request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, step = step.as_str(), "Remote guidance failed, using fallback");
                return None;
            }
        };

        match serde_json::from_str::<RemoteGuidance>(&raw) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(error = %err, step = step.as_str(), "Malformed guidance reply, using fallback");
                None
            }
        }
    }
}

/// Canonical next step in the linear flow. Terminal state maps to itself.
fn successor(step: GuidanceStep) -> GuidanceStep {
    match step {
        GuidanceStep::Start => GuidanceStep::Category,
        GuidanceStep::Category => GuidanceStep::Description,
        GuidanceStep::Description => GuidanceStep::Location,
        GuidanceStep::Location => GuidanceStep::Priority,
        GuidanceStep::Priority | GuidanceStep::Submission => GuidanceStep::Submission,
    }
}

/// Fixed per-step dialog turns used when the remote call is unavailable.
fn fallback_guidance(step: GuidanceStep, context: GuidanceContext) -> Guidance {
    let (message, suggested_actions) = match step {
        GuidanceStep::Start => (
            "Hello! I'm here to help you report your civic complaint. What type of issue would you like to report today?",
            vec![
                "Municipal issue (roads, water, waste)",
                "Political corruption case",
                "Not sure - describe the problem",
            ],
        ),
        GuidanceStep::Category => (
            "Great! Now please describe your issue in detail. What exactly is the problem and how is it affecting you or your community?",
            vec!["Describe the issue", "Upload a photo", "Record voice description"],
        ),
        GuidanceStep::Description => (
            "Thank you for the details. Where exactly is this issue located? Please provide the area, street name, district, or pincode.",
            vec![
                "Enter specific address",
                "Use current location",
                "Provide nearby landmarks",
            ],
        ),
        GuidanceStep::Location => (
            "Perfect! Based on your description, I'll help assess the priority level. Is this an urgent situation that needs immediate attention?",
            vec!["Yes, it's an emergency", "Moderately urgent", "Normal priority"],
        ),
        GuidanceStep::Priority => (
            "Excellent! Your complaint is ready to be submitted. I'll make sure it reaches the right authorities for quick action.",
            vec!["Submit complaint", "Review details", "Add more information"],
        ),
        GuidanceStep::Submission => (
            "Your complaint has been submitted. You can follow its progress under My Reports, and you'll be notified when its status changes.",
            vec!["Track status in My Reports", "Report another issue"],
        ),
    };

    Guidance {
        message: message.to_string(),
        suggested_actions: suggested_actions.into_iter().map(String::from).collect(),
        next_step: successor(step),
        context,
    }
}
