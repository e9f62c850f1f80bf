//! Department notification fan-out: submission alerts and the daily digest
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clients::{ResendClient, TwilioClient};
use crate::db::IssueRepository;
use crate::error::Result;
use crate::models::{Category, Issue, Priority};

/// Department routing table, keyed by the issue's routing bucket.
const DEPARTMENTS: &[(&str, &str, &str)] = &[
    ("potholes", "GHMC Roads Department", "ghmc.roads@telangana.gov.in"),
    ("streetlights", "GHMC Electrical Department", "ghmc.electrical@telangana.gov.in"),
    ("water", "Hyderabad Water Board", "waterboard@telangana.gov.in"),
    ("trash", "GHMC Sanitation Department", "ghmc.sanitation@telangana.gov.in"),
    ("construction", "GHMC Engineering Department", "ghmc.engineering@telangana.gov.in"),
    ("parks", "GHMC Parks & Recreation", "ghmc.parks@telangana.gov.in"),
    ("corpse", "GHMC Health Department", "ghmc.health@telangana.gov.in"),
    ("drainage", "GHMC Drainage Department", "ghmc.drainage@telangana.gov.in"),
    ("corruption", "Anti-Corruption Bureau", "acb@telangana.gov.in"),
];

const FALLBACK_DEPARTMENT: &str = "Municipal Corporation";

/// Delivery status of one notification channel.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Sent,
    Failed,
    /// Channel not configured or no recipient available
    Skipped,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Sent => "sent",
            ChannelStatus::Failed => "failed",
            ChannelStatus::Skipped => "skipped",
        }
    }
}

/// A complaint submission to alert the authorities about.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAlert {
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub priority: Priority,
    pub user_name: String,
    pub user_email: String,
    pub submission_time: String,
}

/// Per-channel result of a submission alert.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertOutcome {
    pub sms_status: ChannelStatus,
    pub email_status: ChannelStatus,
}

/// Per-category result of a digest run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestCategoryResult {
    pub category: String,
    pub department: String,
    pub issue_count: usize,
    pub email_status: ChannelStatus,
}

/// Summary of one daily digest run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestOutcome {
    pub total_issues: usize,
    pub categories_processed: usize,
    pub successful_notifications: usize,
    pub failed_notifications: usize,
    pub results: Vec<DigestCategoryResult>,
}

/// Sends SMS and email notifications to the responsible departments.
///
/// Both channels are optional; a missing client downgrades the channel to
/// `Skipped` rather than failing the operation.
pub struct NotificationService {
    issues: Arc<IssueRepository>,
    sms: Option<Arc<TwilioClient>>,
    email: Option<Arc<ResendClient>>,
    alert_sms_to: Option<String>,
    oversight_email: Option<String>,
}

impl NotificationService {
    pub fn new(
        issues: Arc<IssueRepository>,
        sms: Option<Arc<TwilioClient>>,
        email: Option<Arc<ResendClient>>,
        alert_sms_to: Option<String>,
        oversight_email: Option<String>,
    ) -> Self {
        Self {
            issues,
            sms,
            email,
            alert_sms_to,
            oversight_email,
        }
    }

    /// Alert the responsible department about one submission, over SMS and
    /// email. Channel failures are reported in the outcome, never raised.
    pub async fn notify_submission(&self, alert: &SubmissionAlert) -> AlertOutcome {
        let sms_status = match (&self.sms, self.alert_sms_to.as_deref()) {
            (Some(sms), Some(to)) => match sms.send_sms(to, &sms_body(alert)).await {
                Ok(()) => ChannelStatus::Sent,
                Err(err) => {
                    error!(error = %err, "Submission alert SMS failed");
                    ChannelStatus::Failed
                }
            },
            _ => ChannelStatus::Skipped,
        };

        let email_status = match &self.email {
            Some(email) => {
                let bucket = routing_key(alert.category, alert.subcategory.as_deref());
                let recipients = self.recipients_for(&bucket);
                if recipients.is_empty() {
                    ChannelStatus::Skipped
                } else {
                    let subject = format!("🚨 Complaint Alert: {}", alert.title);
                    match email.send_email(&recipients, &subject, &alert_body(alert)).await {
                        Ok(()) => ChannelStatus::Sent,
                        Err(err) => {
                            error!(error = %err, "Submission alert email failed");
                            ChannelStatus::Failed
                        }
                    }
                }
            }
            None => ChannelStatus::Skipped,
        };

        info!(
            sms = ?sms_status,
            email = ?email_status,
            title = %alert.title,
            "Submission alert processed"
        );

        AlertOutcome {
            sms_status,
            email_status,
        }
    }

    /// Send each department a summary of the issues reported in the last 24
    /// hours that are still in `reported` status. One email per category;
    /// failures are isolated per category.
    pub async fn send_daily_digest(&self) -> Result<DigestOutcome> {
        let cutoff = Utc::now() - Duration::hours(24);
        let issues = self.issues.reported_since(cutoff).await?;
        info!(count = issues.len(), "Collected reported issues for daily digest");

        if issues.is_empty() {
            return Ok(DigestOutcome {
                total_issues: 0,
                categories_processed: 0,
                successful_notifications: 0,
                failed_notifications: 0,
                results: Vec::new(),
            });
        }

        let grouped = group_by_bucket(&issues);
        let mut results = Vec::with_capacity(grouped.len());

        for (bucket, group) in &grouped {
            let (department, _) = department_for(bucket);
            let recipients = self.recipients_for(bucket);

            let email_status = match (&self.email, recipients.is_empty()) {
                (Some(email), false) => {
                    let subject = format!(
                        "📋 Daily Report: {} New {} Issue{} - {}",
                        group.len(),
                        bucket.to_uppercase(),
                        if group.len() > 1 { "s" } else { "" },
                        Utc::now().format("%d/%m/%Y")
                    );
                    match email
                        .send_email(&recipients, &subject, &digest_body(department, bucket, group))
                        .await
                    {
                        Ok(()) => ChannelStatus::Sent,
                        Err(err) => {
                            error!(error = %err, category = %bucket, "Digest email failed");
                            ChannelStatus::Failed
                        }
                    }
                }
                _ => {
                    warn!(category = %bucket, "Digest email skipped, no client or recipients");
                    ChannelStatus::Skipped
                }
            };

            results.push(DigestCategoryResult {
                category: bucket.clone(),
                department: department.to_string(),
                issue_count: group.len(),
                email_status,
            });
        }

        let successful = results
            .iter()
            .filter(|r| r.email_status == ChannelStatus::Sent)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.email_status == ChannelStatus::Failed)
            .count();

        info!(
            categories = results.len(),
            sent = successful,
            failed = failed,
            "Daily digest completed"
        );

        Ok(DigestOutcome {
            total_issues: issues.len(),
            categories_processed: grouped.len(),
            successful_notifications: successful,
            failed_notifications: failed,
            results,
        })
    }

    /// Department address plus the oversight copy, when configured.
    fn recipients_for(&self, bucket: &str) -> Vec<String> {
        let (_, address) = department_for(bucket);
        let mut recipients: Vec<String> = address.map(String::from).into_iter().collect();
        if let Some(oversight) = &self.oversight_email {
            recipients.push(oversight.clone());
        }
        recipients
    }
}

/// Routing bucket for an issue: corruption complaints always route to the
/// corruption desk; municipal ones route by subcategory.
pub fn routing_key(category: Category, subcategory: Option<&str>) -> String {
    match category {
        Category::Corruption => "corruption".to_string(),
        Category::Municipal => subcategory.unwrap_or("other").to_string(),
    }
}

fn department_for(bucket: &str) -> (&'static str, Option<&'static str>) {
    DEPARTMENTS
        .iter()
        .find(|(key, _, _)| *key == bucket)
        .map(|(_, name, email)| (*name, Some(*email)))
        .unwrap_or((FALLBACK_DEPARTMENT, None))
}

fn group_by_bucket(issues: &[Issue]) -> BTreeMap<String, Vec<&Issue>> {
    let mut grouped: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();
    for issue in issues {
        let bucket = routing_key(issue.category, issue.subcategory.as_deref());
        grouped.entry(bucket).or_default().push(issue);
    }
    grouped
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(limit).collect();
        truncated.push_str("...");
        truncated
    }
}

fn sms_body(alert: &SubmissionAlert) -> String {
    format!(
        "🚨 NEW COMPLAINT ALERT\n\n{}\n\nCategory: {}\nPriority: {}\nSubmitted by: {}\n\nDescription: {}\n\nTime: {}",
        alert.title,
        alert.category.as_str(),
        alert.priority.as_str().to_uppercase(),
        alert.user_name,
        truncate_chars(&alert.description, 100),
        alert.submission_time
    )
}

fn alert_body(alert: &SubmissionAlert) -> String {
    let mut body = format!(
        "New complaint report\n\nTitle: {}\nCategory: {}\n",
        alert.title,
        alert.category.as_str()
    );
    if let Some(subcategory) = &alert.subcategory {
        body.push_str(&format!("Subcategory: {}\n", subcategory));
    }
    body.push_str(&format!(
        "Priority: {}\n",
        alert.priority.as_str().to_uppercase()
    ));
    if let Some(location) = &alert.location {
        body.push_str(&format!("Location: {}\n", location));
    }
    body.push_str(&format!(
        "Submitted by: {} ({})\nSubmission time: {}\n\nDescription:\n{}\n\nNext steps: please review this report and take appropriate action.\n\nThis is an automated notification from CivicConnect - Smart Community Reporting",
        alert.user_name, alert.user_email, alert.submission_time, alert.description
    ));
    body
}

fn digest_body(department: &str, bucket: &str, issues: &[&Issue]) -> String {
    let mut body = format!(
        "Daily Issue Report\n\n{}\n{} new {} issue{} reported in the last 24 hours.\n\nIssue details:\n\n",
        department,
        issues.len(),
        bucket,
        if issues.len() > 1 { "s" } else { "" }
    );

    for (index, issue) in issues.iter().enumerate() {
        body.push_str(&format!(
            "{}. {}\n   Location: {}\n   Priority: {}\n   {}\n   Issue ID: {}\n\n",
            index + 1,
            issue.title,
            issue.location.as_deref().unwrap_or("Not specified"),
            issue.priority.as_str().to_uppercase(),
            issue.description,
            issue.id
        ));
    }

    body.push_str(&format!(
        "Action required:\n- Review and prioritize these issues based on urgency\n- Assign appropriate teams for resolution\n- Update status in the system as work progresses\n- Contact citizens for additional information if needed\n\nReport generated: {}\n\nThis is an automated daily report from CivicConnect - Smart Community Reporting Platform",
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));
    body
}
