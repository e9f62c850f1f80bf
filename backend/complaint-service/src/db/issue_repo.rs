/// Issue repository - persistence for citizen-submitted issues
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Category, CategoryCount, Issue, IssueStatus, Priority, UserComplaintStats,
};

const ISSUE_COLUMNS: &str =
    "id, title, description, category, subcategory, location, priority, status, image_url, user_id, created_at, updated_at";

/// Insert parameters for a new issue.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub subcategory: Option<String>,
    pub location: Option<String>,
    pub priority: Priority,
    pub image_url: Option<String>,
    pub user_id: Uuid,
}

pub struct IssueRepository {
    pool: PgPool,
}

impl IssueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new issue in `reported` status. The classifier-accepted
    /// category and priority are persisted exactly as given.
    pub async fn create(&self, new_issue: &NewIssue) -> Result<Issue> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO issues (id, title, description, category, subcategory, location, priority, status, image_url, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_issue.title)
        .bind(&new_issue.description)
        .bind(new_issue.category.as_str())
        .bind(&new_issue.subcategory)
        .bind(&new_issue.location)
        .bind(new_issue.priority.as_str())
        .bind(IssueStatus::Reported.as_str())
        .bind(&new_issue.image_url)
        .bind(new_issue.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(issue_from_row(&row))
    }

    /// Community feed: all issues, newest first.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ISSUE_COLUMNS}
            FROM issues
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(issue_from_row).collect())
    }

    /// All issues submitted by one user, newest first.
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ISSUE_COLUMNS}
            FROM issues
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(issue_from_row).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Issue>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ISSUE_COLUMNS}
            FROM issues
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(issue_from_row))
    }

    /// Update an issue's status. Owner-only: returns false when the issue
    /// does not exist or belongs to someone else.
    pub async fn update_status(
        &self,
        id: Uuid,
        user_id: Uuid,
        status: IssueStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE issues
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND user_id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an issue and its suggestions in one transaction. Owner-only.
    /// Suggestions go first; the schema has no ON DELETE CASCADE.
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM suggestions
            WHERE issue_id = $1
              AND EXISTS (SELECT 1 FROM issues WHERE id = $1 AND user_id = $2)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM issues WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Issues still in `reported` status submitted after the cutoff; feeds
    /// the daily digest.
    pub async fn reported_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ISSUE_COLUMNS}
            FROM issues
            WHERE status = $1 AND created_at >= $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(IssueStatus::Reported.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(issue_from_row).collect())
    }

    /// Aggregate one user's complaint history for the chatbot.
    pub async fn user_stats(&self, user_id: Uuid) -> Result<UserComplaintStats> {
        let issues = self.list_by_user(user_id).await?;
        Ok(compute_stats(issues))
    }
}

fn issue_from_row(row: &PgRow) -> Issue {
    Issue {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        category: Category::parse(&row.get::<String, _>("category")),
        subcategory: row.get("subcategory"),
        location: row.get("location"),
        priority: Priority::parse(&row.get::<String, _>("priority")),
        status: IssueStatus::parse(&row.get::<String, _>("status")),
        image_url: row.get("image_url"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// `issues` must be ordered newest first; the newest entry becomes
/// `recent_issue` and the per-status lists keep that order.
fn compute_stats(issues: Vec<Issue>) -> UserComplaintStats {
    let mut stats = UserComplaintStats {
        total: issues.len() as i64,
        recent_issue: issues.first().cloned(),
        ..Default::default()
    };

    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    for issue in &issues {
        match issue.status {
            IssueStatus::Reported => stats.pending += 1,
            IssueStatus::InProgress => stats.in_progress += 1,
            IssueStatus::Resolved => stats.resolved += 1,
        }
        let bucket = issue
            .subcategory
            .clone()
            .unwrap_or_else(|| issue.category.as_str().to_string());
        *buckets.entry(bucket).or_insert(0) += 1;
    }

    stats.pending_recent = issues
        .iter()
        .filter(|issue| issue.status == IssueStatus::Reported)
        .take(3)
        .cloned()
        .collect();
    stats.resolved_recent = issues
        .iter()
        .filter(|issue| issue.status == IssueStatus::Resolved)
        .take(3)
        .cloned()
        .collect();

    stats.category_counts = buckets
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();

    stats
}
