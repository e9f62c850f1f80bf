/// Suggestion repository - resolution proposals attached to issues
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Suggestion;

pub struct SuggestionRepository {
    pool: PgPool,
}

impl SuggestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        issue_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Suggestion> {
        let suggestion = sqlx::query_as::<_, Suggestion>(
            r#"
            INSERT INTO suggestions (id, issue_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, issue_id, user_id, content, likes, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(issue_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(suggestion)
    }

    /// Suggestions for one issue, newest first.
    pub async fn list_by_issue(&self, issue_id: Uuid) -> Result<Vec<Suggestion>> {
        let suggestions = sqlx::query_as::<_, Suggestion>(
            r#"
            SELECT id, issue_id, user_id, content, likes, created_at, updated_at
            FROM suggestions
            WHERE issue_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(suggestions)
    }

    /// All suggestions across issues, newest first.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Suggestion>> {
        let suggestions = sqlx::query_as::<_, Suggestion>(
            r#"
            SELECT id, issue_id, user_id, content, likes, created_at, updated_at
            FROM suggestions
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(suggestions)
    }

    /// Increment the like counter. Votes are not de-duplicated per user.
    /// Returns the new count, or None when the suggestion does not exist.
    pub async fn like(&self, suggestion_id: Uuid) -> Result<Option<i32>> {
        let likes = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE suggestions
            SET likes = likes + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING likes
            "#,
        )
        .bind(suggestion_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(likes)
    }

    /// Decrement the like counter, clamped at zero.
    pub async fn unlike(&self, suggestion_id: Uuid) -> Result<Option<i32>> {
        let likes = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE suggestions
            SET likes = GREATEST(likes - 1, 0), updated_at = NOW()
            WHERE id = $1
            RETURNING likes
            "#,
        )
        .bind(suggestion_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(likes)
    }
}
