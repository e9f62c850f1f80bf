/// Assist handlers - AI-backed helpers behind the complaint form
use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::UserId;
use crate::models::{GuidanceContext, GuidanceStep};
use crate::services::{ChatbotService, ClassifierService, GuidanceService, ImageAnalysisService};
use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Decoded image uploads above this size are rejected.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to true; false skips the emergency keyword escalation.
    pub check_emergency: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    #[validate(length(min = 1, message = "Image data is required for analysis"))]
    pub image: String,
    #[serde(default = "default_image_type")]
    pub image_type: String,
}

fn default_image_type() -> String {
    "image/jpeg".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceRequest {
    pub step: String,
    pub user_input: Option<String>,
    #[serde(default)]
    pub context: GuidanceContext,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
    pub conversation_id: Option<String>,
}

/// Suggest category/subcategory/priority for complaint text.
///
/// POST /api/v1/assist/classify
pub async fn classify(
    service: web::Data<Arc<ClassifierService>>,
    req: web::Json<ClassifyRequest>,
) -> Result<HttpResponse> {
    metrics::observe_assist_request("classify");

    let title = req.title.trim();
    let description = req.description.trim();
    if title.is_empty() && description.is_empty() {
        return Err(AppError::Validation(
            "Title or description is required".to_string(),
        ));
    }

    let result = service
        .classify(title, description, req.check_emergency.unwrap_or(true))
        .await;

    Ok(HttpResponse::Ok().json(result))
}

/// Categorize an uploaded complaint photo.
///
/// POST /api/v1/assist/analyze-image
pub async fn analyze_image(
    service: web::Data<Arc<ImageAnalysisService>>,
    req: web::Json<AnalyzeImageRequest>,
) -> Result<HttpResponse> {
    metrics::observe_assist_request("analyze_image");

    if let Err(e) = req.validate() {
        if e.field_errors().contains_key("image") {
            return Err(AppError::Validation(
                "Image data is required for analysis".to_string(),
            ));
        }
    }

    // Reject garbage before it reaches the vision API.
    let decoded = BASE64
        .decode(req.image.as_bytes())
        .map_err(|_| AppError::Validation("Image data is not valid base64".to_string()))?;
    if decoded.len() > MAX_IMAGE_BYTES {
        return Err(AppError::Validation(
            "Image exceeds the 5MB upload limit".to_string(),
        ));
    }

    let analysis = service.analyze(&req.image, &req.image_type).await;

    Ok(HttpResponse::Ok().json(analysis))
}

/// Advance the guided complaint-reporting dialog by one turn.
///
/// POST /api/v1/assist/guidance
pub async fn guidance(
    service: web::Data<Arc<GuidanceService>>,
    req: web::Json<GuidanceRequest>,
) -> Result<HttpResponse> {
    metrics::observe_assist_request("guidance");

    let req = req.into_inner();
    let step = GuidanceStep::from_str(&req.step)
        .ok_or_else(|| AppError::Validation(format!("Unknown guidance step: {}", req.step)))?;

    let reply = service
        .advise(step, req.user_input.as_deref(), req.context)
        .await;

    Ok(HttpResponse::Ok().json(reply))
}

/// Answer a help-chat message for the authenticated citizen.
///
/// POST /api/v1/assist/chat
pub async fn chat(
    service: web::Data<Arc<ChatbotService>>,
    user: UserId,
    req: web::Json<ChatRequest>,
) -> Result<HttpResponse> {
    metrics::observe_assist_request("chat");

    let req = ChatRequest {
        message: req.message.trim().to_string(),
        conversation_id: req.conversation_id.clone(),
    };
    if req.validate().is_err() {
        return Err(AppError::Validation("Message is required".to_string()));
    }

    let reply = service.chat(user.0, &req.message, req.conversation_id).await;

    Ok(HttpResponse::Ok().json(reply))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/assist")
            .route("/classify", web::post().to(classify))
            .route("/analyze-image", web::post().to(analyze_image))
            .route("/guidance", web::post().to(guidance))
            .route("/chat", web::post().to(chat)),
    );
}
