/// Suggestion handlers - community-proposed resolutions and like votes
use crate::db::{IssueRepository, SuggestionRepository};
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::issues::PaginationParams;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSuggestionRequest {
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

/// Propose a resolution for an issue
///
/// POST /api/v1/issues/{issue_id}/suggestions
pub async fn create_suggestion(
    issues: web::Data<Arc<IssueRepository>>,
    suggestions: web::Data<Arc<SuggestionRepository>>,
    issue_id: web::Path<Uuid>,
    user: UserId,
    req: web::Json<CreateSuggestionRequest>,
) -> Result<HttpResponse> {
    let content = req.content.trim().to_string();
    let req = CreateSuggestionRequest { content };
    if req.validate().is_err() {
        return Err(AppError::Validation("Content is required".to_string()));
    }

    if issues.get(*issue_id).await?.is_none() {
        return Err(AppError::NotFound("Issue not found".to_string()));
    }

    let suggestion = suggestions.create(*issue_id, user.0, &req.content).await?;
    Ok(HttpResponse::Created().json(suggestion))
}

/// Suggestions for one issue, newest first
///
/// GET /api/v1/issues/{issue_id}/suggestions
pub async fn list_issue_suggestions(
    suggestions: web::Data<Arc<SuggestionRepository>>,
    issue_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let items = suggestions.list_by_issue(*issue_id).await?;
    Ok(HttpResponse::Ok().json(items))
}

/// All suggestions across issues, newest first
///
/// GET /api/v1/suggestions
pub async fn list_suggestions(
    suggestions: web::Data<Arc<SuggestionRepository>>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);
    let items = suggestions.list(limit, offset).await?;
    Ok(HttpResponse::Ok().json(items))
}

/// Like a suggestion
///
/// POST /api/v1/suggestions/{id}/like
pub async fn like_suggestion(
    suggestions: web::Data<Arc<SuggestionRepository>>,
    suggestion_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match suggestions.like(*suggestion_id).await? {
        Some(likes) => Ok(HttpResponse::Ok().json(serde_json::json!({ "likes": likes }))),
        None => Err(AppError::NotFound("Suggestion not found".to_string())),
    }
}

/// Withdraw a like; the count never goes below zero
///
/// DELETE /api/v1/suggestions/{id}/like
pub async fn unlike_suggestion(
    suggestions: web::Data<Arc<SuggestionRepository>>,
    suggestion_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match suggestions.unlike(*suggestion_id).await? {
        Some(likes) => Ok(HttpResponse::Ok().json(serde_json::json!({ "likes": likes }))),
        None => Err(AppError::NotFound("Suggestion not found".to_string())),
    }
}

/// Register routes (the per-issue routes live under the issues scope)
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/suggestions")
            .route("", web::get().to(list_suggestions))
            .service(
                web::resource("/{suggestion_id}/like")
                    .route(web::post().to(like_suggestion))
                    .route(web::delete().to(unlike_suggestion)),
            ),
    );
}
