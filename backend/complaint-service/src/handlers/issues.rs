/// Issue handlers - HTTP endpoints for complaint CRUD
use crate::db::{IssueRepository, NewIssue};
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::{Category, IssueStatus, Priority};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Request body for filing a complaint. Category and priority arrive as the
/// classifier suggested them (or as the user overrode them) and are stored
/// unmodified.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIssueRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub location: Option<String>,
    pub priority: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// File a new complaint
///
/// POST /api/v1/issues
pub async fn create_issue(
    repo: web::Data<Arc<IssueRepository>>,
    user: UserId,
    req: web::Json<CreateIssueRequest>,
) -> Result<HttpResponse> {
    let req = CreateIssueRequest {
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        category: req.category.clone(),
        subcategory: req.subcategory.clone(),
        location: req.location.clone(),
        priority: req.priority.clone(),
        image_url: req.image_url.clone(),
    };
    if let Err(e) = req.validate() {
        let fields = e.field_errors();
        if fields.contains_key("title") {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        return Err(AppError::Validation("Description is required".to_string()));
    }

    let new_issue = NewIssue {
        title: req.title,
        description: req.description,
        category: Category::parse(req.category.as_deref().unwrap_or("municipal")),
        subcategory: req.subcategory,
        location: req.location,
        priority: Priority::parse(req.priority.as_deref().unwrap_or("medium")),
        image_url: req.image_url,
        user_id: user.0,
    };

    let issue = repo.create(&new_issue).await?;
    Ok(HttpResponse::Created().json(issue))
}

/// Community feed: all complaints, newest first
///
/// GET /api/v1/issues
pub async fn list_issues(
    repo: web::Data<Arc<IssueRepository>>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);
    let issues = repo.list(limit, offset).await?;
    Ok(HttpResponse::Ok().json(issues))
}

/// The caller's own complaints
///
/// GET /api/v1/issues/mine
pub async fn list_my_issues(
    repo: web::Data<Arc<IssueRepository>>,
    user: UserId,
) -> Result<HttpResponse> {
    let issues = repo.list_by_user(user.0).await?;
    Ok(HttpResponse::Ok().json(issues))
}

/// Get a single complaint
///
/// GET /api/v1/issues/{id}
pub async fn get_issue(
    repo: web::Data<Arc<IssueRepository>>,
    issue_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match repo.get(*issue_id).await? {
        Some(issue) => Ok(HttpResponse::Ok().json(issue)),
        None => Err(AppError::NotFound("Issue not found".to_string())),
    }
}

/// Move a complaint through its lifecycle. Owner-only; a non-owner gets the
/// same 404 as a missing issue.
///
/// PATCH /api/v1/issues/{id}/status
pub async fn update_issue_status(
    repo: web::Data<Arc<IssueRepository>>,
    issue_id: web::Path<Uuid>,
    user: UserId,
    req: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse> {
    let status = IssueStatus::from_str(&req.status)
        .ok_or_else(|| AppError::Validation(format!("Unknown status: {}", req.status)))?;

    let updated = repo.update_status(*issue_id, user.0, status).await?;
    if updated {
        Ok(HttpResponse::Ok().finish())
    } else {
        Err(AppError::NotFound("Issue not found".to_string()))
    }
}

/// Delete a complaint and its suggestions. Owner-only.
///
/// DELETE /api/v1/issues/{id}
pub async fn delete_issue(
    repo: web::Data<Arc<IssueRepository>>,
    issue_id: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    let deleted = repo.delete(*issue_id, user.0).await?;
    if deleted {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(AppError::NotFound("Issue not found".to_string()))
    }
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/issues")
            .service(
                web::resource("")
                    .route(web::post().to(create_issue))
                    .route(web::get().to(list_issues)),
            )
            .route("/mine", web::get().to(list_my_issues))
            .service(
                web::resource("/{issue_id}")
                    .route(web::get().to(get_issue))
                    .route(web::delete().to(delete_issue)),
            )
            .route("/{issue_id}/status", web::patch().to(update_issue_status))
            .service(
                web::resource("/{issue_id}/suggestions")
                    .route(web::post().to(super::suggestions::create_suggestion))
                    .route(web::get().to(super::suggestions::list_issue_suggestions)),
            ),
    );
}
