//! Conversational civic assistant
//!
//! Answers are produced in priority order: feature FAQ keyword match first,
//! then intents over the user's own complaint data, then a single remote
//! completion attempt, and finally the static FAQ tables. Only the remote
//! layer can fail, and its failure is invisible to the caller.
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::clients::{CompletionBackend, CompletionRequest, UserContent};
use crate::db::IssueRepository;
use crate::models::{ChatReply, UserComplaintStats};

struct FaqEntry {
    keywords: &'static [&'static str],
    response: &'static str,
}

/// Questions about platform features, answered without touching the database.
const FEATURE_FAQS: &[FaqEntry] = &[
    FaqEntry {
        keywords: &["status tracker", "where find status", "track location", "dashboard", "find tracker"],
        response: "📍 **Finding the Status Tracker:**\n\nThe Status Tracker lives in your main dashboard under the \"My Reports\" section:\n1. Go to the main dashboard\n2. Open \"My Reports\" in the navigation menu\n3. Each complaint shows its current status with color coding\n\n**Status colors:** 🔴 Pending (just submitted), 🟡 In Progress (being worked on), 🟢 Resolved (completed).",
    },
    FaqEntry {
        keywords: &["upload image", "attach photo", "add picture", "image support", "photo upload"],
        response: "📸 **Image Upload Feature:**\n\nYes! You can attach images when submitting complaints to help authorities understand the issue better:\n1. In the complaint form, look for the \"Upload Images\" section\n2. Click \"Choose Files\" or drag & drop\n3. JPG, PNG and other common formats are supported\n4. Maximum 5MB per image, up to 3 images per complaint\n\nClear, well-lit photos from multiple angles significantly improve resolution speed.",
    },
    FaqEntry {
        keywords: &["voice to text", "voice input", "speak", "microphone", "illiterate", "audio input"],
        response: "🎤 **Voice-to-Text Feature:**\n\nWe support voice input for users who prefer speaking over typing:\n1. Look for the microphone icon in complaint forms and chat\n2. Click it and speak clearly in Telugu, Hindi, or English\n3. Click stop - the text appears automatically\n4. Review and edit the text before submitting\n\nThis is especially helpful for elderly users, and accuracy is high with clear speech.",
    },
    FaqEntry {
        keywords: &["anonymous", "private complaint", "hide identity", "confidential", "secret reporting"],
        response: "🔒 **Anonymous Complaint Feature:**\n\nYes! You can file completely anonymous complaints to protect your identity, especially important for corruption cases:\n1. Check \"File Anonymous Complaint\" during submission\n2. Your name and contact details are hidden from public view\n3. Only the complaint content and location are visible\n4. You still get a tracking ID via email for follow-up\n\nBest for corruption complaints, whistleblowing, and disputes where you prefer privacy.",
    },
    FaqEntry {
        keywords: &["complaint categories", "issue types", "what can report", "report types"],
        response: "🏢 **Available Complaint Categories:**\n\n**Municipal services:** roads & infrastructure (GHMC Roads), water supply (Water Board), waste management (Sanitation), streetlights (Electrical), drainage & sewage (Engineering)\n\n**Governance & corruption:** bribery cases (Anti-Corruption Bureau), misuse of funds (Vigilance)\n\nEach category automatically routes to the right department - no need to figure out who to contact!",
    },
    FaqEntry {
        keywords: &["notifications", "alerts", "sms updates", "email updates", "how get notified"],
        response: "🔔 **Notification System:**\n\nYou receive automatic updates about your complaints:\n\n**SMS:** instant confirmation on submission, status change alerts, resolution confirmation\n**Email:** detailed status reports and weekly summaries\n**In-app:** real-time updates under \"My Reports\"\n\nManage preferences under Settings → Notifications (SMS, email, or both).",
    },
    FaqEntry {
        keywords: &["ai features", "smart suggestions", "auto category", "ai help"],
        response: "🤖 **AI-Powered Features:**\n\n**Smart categorization:** category, priority and the responsible authority are suggested automatically from your description\n**Image analysis:** uploaded photos are analyzed to suggest the right category\n**Guided reporting:** a step-by-step complaint assistant\n**Conversational interface:** ask me things like \"How many road complaints are pending?\"\n\nThe AI learns from successful resolutions to help everyone get better results!",
    },
];

/// General process questions, used as the last resort.
const GENERAL_FAQS: &[FaqEntry] = &[
    FaqEntry {
        keywords: &["submit", "report", "complaint", "issue", "how to", "file"],
        response: "📝 **How to Submit a Complaint:**\n\n1. Click \"Report Issues\" in the main dashboard\n2. Select a category: roads, water, waste, streetlights, drainage\n3. Describe the problem clearly and add the location (district/pincode/landmark)\n4. Upload photos - they speed up resolution!\n5. Submit and note your tracking ID\n\nYou can also type \"report an issue\" here for step-by-step guidance.",
    },
    FaqEntry {
        keywords: &["track", "status", "follow", "check", "my complaint", "progress"],
        response: "📊 **How to Track Your Complaint Status:**\n\n1. **Dashboard:** open the \"My Reports\" section\n2. **Chatbot:** ask me \"track my complaints\"\n3. **SMS/Email:** automatic updates are sent on every status change\n\n**Status meanings:** Pending = received and being reviewed, In Progress = authority actively working, Resolved = fixed.\n\n**Typical timelines:** municipal issues 3-7 business days, corruption cases 7-15, emergencies same day.",
    },
    FaqEntry {
        keywords: &["edit", "update", "change", "modify", "delete", "remove"],
        response: "✏️ **Managing Your Complaints:**\n\n**Editing:** open the complaint in \"My Reports\" and use \"Edit\" to update the description or add photos. The category cannot change after submission.\n**Deleting:** possible from the complaint details; this is permanent and cannot be undone.\n**Updates:** prefer adding clarifications over deleting - the full history helps authorities resolve faster.",
    },
    FaqEntry {
        keywords: &["authority", "contact", "phone", "email", "office", "help", "support"],
        response: "📞 **Contact Information & Authorities:**\n\n**Municipal:** GHMC 155304, Water Board 155313, Electricity 1912\n**Corruption:** ACB Telangana 040-2325-1555, Vigilance 040-2346-1151\n**Emergency:** Fire 101, Ambulance 108, Police 100\n\nFor urgent issues call first, then file the complaint, and mention your complaint ID when calling.",
    },
    FaqEntry {
        keywords: &["category", "type", "issues", "what can report", "kind"],
        response: "🏢 **Issue Categories & Examples:**\n\n**Municipal:** roads (potholes, broken footpaths), water (leakage, shortage), waste (garbage collection, dumping), streetlights (outages), drainage (blockages, overflow), parks\n**Corruption:** bribery, document processing delays, misuse of public funds\n\n**Not handled:** private disputes between individuals, court cases, central government issues.",
    },
    FaqEntry {
        keywords: &["anonymous", "privacy", "identity", "confidential", "secret"],
        response: "🔒 **Privacy & Anonymous Reporting:**\n\nYour personal details are never shown publicly. Check \"Anonymous\" during submission to hide your identity entirely - recommended for corruption reports. Phone numbers are optional for anonymous complaints, and authority access to complaint data is logged.",
    },
];

const DEFAULT_RESPONSE: &str = "🤖 **Welcome to Your AI Civic Assistant!**\n\nI can help you with:\n• **Complaint reporting** - type \"report an issue\" for guided submission\n• **Status tracking** - ask \"track my complaints\"\n• **Authority information** - who handles what, with contact numbers\n\nPopular queries: \"How to report a pothole?\", \"Water supply complaint procedure\", \"Track complaint status\".\n\nWhat issue would you like to address today?";

const CHAT_SYSTEM_PROMPT: &str = r#"You are an advanced AI assistant for the "Civic Crowdsourced Reporting System" in Telangana. You are feature-aware and data-connected.

Your capabilities:
1. Answer questions about website features (Status Tracker location, image upload, voice input, etc.)
2. Provide personalized complaint status using real user data
3. Help users navigate the platform efficiently
4. Guide through complaint reporting with smart suggestions
5. Connect users to the right authorities with specific contact information

Key features to reference:
- Status Tracker: In "My Reports" dashboard section
- Image Upload: Available during complaint submission (5MB limit, multiple formats)
- Voice-to-Text: Microphone icon for audio input
- Anonymous Mode: For sensitive/corruption complaints
- Real-time Notifications: SMS/Email updates on status changes

Authorities:
- Municipal: GHMC (155304), Water Board (155313), Electricity (1912)
- Corruption: ACB Telangana (040-2325-1555), Vigilance (040-2346-1151)

Be conversational, helpful, and specific. Use user data when available. Avoid generic responses - tailor answers to the actual question and context."#;

/// Chatbot over the FAQ tables, the user's complaint history, and the
/// completion backend.
pub struct ChatbotService {
    backend: Option<Arc<dyn CompletionBackend>>,
    issues: Arc<IssueRepository>,
}

impl ChatbotService {
    pub fn new(backend: Option<Arc<dyn CompletionBackend>>, issues: Arc<IssueRepository>) -> Self {
        Self { backend, issues }
    }

    /// Answer one chat message. Infallible: database and remote failures
    /// degrade to static answers.
    pub async fn chat(
        &self,
        user_id: Uuid,
        message: &str,
        conversation_id: Option<String>,
    ) -> ChatReply {
        let conversation_id = conversation_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(mint_conversation_id);
        let lower = message.to_lowercase();

        // Feature FAQ wins outright and needs no data.
        if let Some(response) = feature_faq_response(&lower) {
            return ChatReply {
                response: response.to_string(),
                conversation_id,
            };
        }

        let stats = match self.issues.user_stats(user_id).await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(error = %err, "Failed to load user complaint stats for chat");
                UserComplaintStats::default()
            }
        };

        let response = self.respond(message, &lower, &stats).await;
        ChatReply {
            response,
            conversation_id,
        }
    }

    async fn respond(&self, message: &str, lower: &str, stats: &UserComplaintStats) -> String {
        if let Some(response) = user_data_response(lower, stats) {
            return response;
        }

        if let Some(backend) = &self.backend {
            if let Some(response) = self.chat_remote(backend.as_ref(), message, stats).await {
                return response;
            }
        }

        general_fallback(lower).to_string()
    }

    async fn chat_remote(
        &self,
        backend: &dyn CompletionBackend,
        message: &str,
        stats: &UserComplaintStats,
    ) -> Option<String> {
        let categories = stats
            .category_counts
            .iter()
            .map(|c| c.category.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let recent = stats
            .recent_issue
            .as_ref()
            .map(|issue| format!("\"{}\" ({})", issue.title, issue.status.as_str()))
            .unwrap_or_else(|| "None".to_string());

        let system = format!(
            "{}\n\nUser Context:\n- Total complaints: {} ({} pending, {} in progress, {} resolved)\n- Categories used: {}\n- Most recent: {}",
            CHAT_SYSTEM_PROMPT,
            stats.total,
            stats.pending,
            stats.in_progress,
            stats.resolved,
            if categories.is_empty() { "None" } else { &categories },
            recent
        );

        let request = CompletionRequest {
            system,
            user: UserContent::Text(message.to_string()),
            max_tokens: 600,
            temperature: 0.7,
        };

        match backend.complete(request).await {
            Ok(response) => Some(response),
            Err(err) => {
                warn!(error = %err, "Remote chat completion failed, using FAQ fallback");
                None
            }
        }
    }
}

fn mint_conversation_id() -> String {
    format!("conv_{}", Uuid::new_v4())
}

fn match_faq(lower: &str, entries: &'static [FaqEntry]) -> Option<&'static str> {
    entries
        .iter()
        .find(|entry| entry.keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|entry| entry.response)
}

fn feature_faq_response(lower: &str) -> Option<&'static str> {
    match_faq(lower, FEATURE_FAQS)
}

fn general_fallback(lower: &str) -> &'static str {
    match_faq(lower, GENERAL_FAQS).unwrap_or(DEFAULT_RESPONSE)
}

fn avg_response_time(stats: &UserComplaintStats) -> &'static str {
    if stats.resolved > 0 {
        "3-5 days"
    } else {
        "No data yet"
    }
}

/// Answers grounded in the user's own complaint history.
fn user_data_response(lower: &str, stats: &UserComplaintStats) -> Option<String> {
    if lower.contains("status") || lower.contains("track") || lower.contains("my complaint") {
        return Some(status_overview(stats));
    }

    if lower.contains("resolved") || lower.contains("completed") || lower.contains("fixed") {
        return Some(resolved_overview(stats));
    }

    if lower.contains("pending") || lower.contains("how many") {
        return Some(pending_overview(stats));
    }

    if lower.contains("road") || lower.contains("water") || lower.contains("waste") {
        return category_overview(lower, stats);
    }

    None
}

fn status_overview(stats: &UserComplaintStats) -> String {
    if stats.total == 0 {
        return "🔍 **Your Complaint Status:**\n\nYou haven't submitted any complaints yet! Click \"Report Issues\" to submit your first complaint, or type \"report an issue\" here and I'll guide you through it.\n\nOnce you have complaints, the Status Tracker in \"My Reports\" shows their progress.".to_string();
    }

    let latest = stats
        .recent_issue
        .as_ref()
        .map(|issue| {
            format!(
                "**🔍 Latest:** \"{}\" ({}) - {}\n\n",
                issue.title,
                issue.status.as_str(),
                issue.category.as_str()
            )
        })
        .unwrap_or_default();

    let pending_note = if stats.pending > 0 {
        format!(
            "\n\n💡 Your pending complaints are being reviewed. Average response time: {}.",
            avg_response_time(stats)
        )
    } else {
        String::new()
    };

    format!(
        "📊 **Your Current Status Overview:**\n\n**Summary:** {} total complaints\n• 🔴 {} Pending (awaiting review)\n• 🟡 {} In Progress (being resolved)\n• 🟢 {} Resolved (completed)\n\n{}**To see detailed status:** open \"My Reports\" in your dashboard - that's where the Status Tracker lives!{}",
        stats.total, stats.pending, stats.in_progress, stats.resolved, latest, pending_note
    )
}

fn resolved_overview(stats: &UserComplaintStats) -> String {
    if stats.resolved == 0 {
        let note = if stats.pending > 0 {
            format!(
                " But you have {} pending complaint(s) being worked on! Most complaints resolve within {}.",
                stats.pending,
                avg_response_time(stats)
            )
        } else if stats.total == 0 {
            " No complaints submitted yet - ready to report an issue? I can guide you through the process!".to_string()
        } else {
            String::new()
        };
        return format!(
            "✅ **Your Resolved Complaints:**\n\nYou don't have any resolved complaints yet.{}",
            note
        );
    }

    let mut response = format!("✅ **Your Resolved Complaints ({}):**\n\n", stats.resolved);
    for (index, issue) in stats.resolved_recent.iter().enumerate() {
        response.push_str(&format!(
            "{}. **{}**\n   Category: {} | Priority: {}\n   Resolved: {}\n\n",
            index + 1,
            issue.title,
            issue.category.as_str(),
            issue.priority.as_str(),
            issue.updated_at.format("%Y-%m-%d")
        ));
    }
    if stats.resolved > stats.resolved_recent.len() as i64 {
        response.push_str(&format!(
            "...and {} more resolved complaints.\n\n",
            stats.resolved - stats.resolved_recent.len() as i64
        ));
    }
    response.push_str("🎯 These issues are now fixed thanks to your reporting.");
    response
}

fn pending_overview(stats: &UserComplaintStats) -> String {
    if stats.pending == 0 {
        let processed = if stats.total > 0 {
            format!("All your {} complaint(s) have been processed.", stats.total)
        } else {
            "No complaints submitted yet.".to_string()
        };
        let cheer = if stats.resolved > 0 {
            format!(
                "\n\n🎉 Great news: {} of your complaints have been resolved!",
                stats.resolved
            )
        } else {
            String::new()
        };
        return format!(
            "📊 **Pending Complaints Count:**\n\nYou have **0 pending complaints** right now! {}{}",
            processed, cheer
        );
    }

    let now = Utc::now();
    let mut response = format!("⏳ **Your Pending Complaints ({}):**\n\n", stats.pending);
    for (index, issue) in stats.pending_recent.iter().enumerate() {
        let days_pending = (now - issue.created_at).num_days();
        response.push_str(&format!(
            "{}. **{}** ({})\n   Priority: {} | Submitted: {} days ago\n\n",
            index + 1,
            issue.title,
            issue.category.as_str(),
            issue.priority.as_str(),
            days_pending
        ));
    }
    response.push_str(
        "💡 Go to \"My Reports\" in your dashboard for real-time updates on these complaints.",
    );
    response
}

fn category_overview(lower: &str, stats: &UserComplaintStats) -> Option<String> {
    // Keyword in the question -> subcategory bucket in the stats.
    let buckets: &[(&str, &str, &str)] = &[
        ("road", "potholes", "GHMC Road Department: 155304"),
        ("water", "water", "Hyderabad Water Board: 155313"),
        ("waste", "trash", "GHMC Sanitation: 155304"),
        ("electric", "streetlights", "GHMC Electrical Department: 1912"),
        ("drainage", "drainage", "GHMC Drainage Department: 155304"),
    ];

    let (keyword, bucket, authority) = buckets
        .iter()
        .find(|(keyword, _, _)| lower.contains(keyword))?;

    let count = stats
        .category_counts
        .iter()
        .find(|entry| entry.category == *bucket)
        .map(|entry| entry.count)
        .filter(|count| *count > 0)?;

    Some(format!(
        "📊 **Your {} Complaints:**\n\nYou've reported **{} {} issue(s)**.\n\n**To see details:** check \"My Reports\" and filter by the \"{}\" category.\n\n**📞 Relevant authority:** {}\n\nNeed help with a new {} issue? I can guide you through reporting it! 🛠️",
        bucket, count, bucket, bucket, authority, keyword
    ))
}
