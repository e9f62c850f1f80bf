/// Notification handlers - department alert dispatch
use crate::error::Result;
use crate::metrics;
use crate::services::notifications::SubmissionAlert;
use crate::services::NotificationService;
use actix_web::{web, HttpResponse};
use std::sync::Arc;

/// Send the SMS + email department alert for a submitted complaint and
/// report per-channel delivery status. Channel failures land in the body,
/// not in the HTTP status.
///
/// POST /api/v1/notifications/test
pub async fn send_test_notification(
    service: web::Data<Arc<NotificationService>>,
    alert: web::Json<SubmissionAlert>,
) -> Result<HttpResponse> {
    let outcome = service.notify_submission(&alert).await;

    metrics::observe_notification("sms", outcome.sms_status.as_str());
    metrics::observe_notification("email", outcome.email_status.as_str());

    Ok(HttpResponse::Ok().json(outcome))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications").route("/test", web::post().to(send_test_notification)),
    );
}
