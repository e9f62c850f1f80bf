//! HTTP-level tests for the complaint API.
//!
//! Each test assembles the real route table and JWT middleware with
//! `actix_web::test`, backed by stub completion backends instead of the
//! OpenAI API. None of these tests needs a running Postgres: the exercised
//! paths either never reach the pool, or treat an unreachable database as
//! part of the scenario. Real round-trips live in `repository_tests.rs`.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use anyhow::anyhow;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use mockall::mock;
use serde_json::{json, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use complaint_service::clients::{CompletionBackend, CompletionRequest};
use complaint_service::db::{IssueRepository, SuggestionRepository};
use complaint_service::handlers;
use complaint_service::metrics;
use complaint_service::middleware::{Claims, JwtAuthMiddleware};
use complaint_service::services::{
    ChatbotService, ClassifierService, GuidanceService, ImageAnalysisService, NotificationService,
};

const TEST_SECRET: &str = "test-secret";

mock! {
    Backend {}

    #[async_trait::async_trait]
    impl CompletionBackend for Backend {
        async fn complete(&self, request: CompletionRequest) -> anyhow::Result<String>;
    }
}

fn bearer(user_id: Uuid) -> (&'static str, String) {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + 3600) as usize,
        iat: now as usize,
        email: "citizen@example.com".to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("encode token");
    ("Authorization", format!("Bearer {token}"))
}

/// A pool whose acquires fail fast. Handlers that never touch the database
/// carry it as inert wiring; the health tests use it as the "database down"
/// scenario.
fn unreachable_pool() -> PgPool {
    let options = "postgres://nobody@127.0.0.1:1/nothing"
        .parse()
        .expect("pool options");
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy_with(options)
}

fn issue_repo() -> web::Data<Arc<IssueRepository>> {
    web::Data::new(Arc::new(IssueRepository::new(unreachable_pool())))
}

fn suggestion_repo() -> web::Data<Arc<SuggestionRepository>> {
    web::Data::new(Arc::new(SuggestionRepository::new(unreachable_pool())))
}

fn classifier(
    backend: Option<Arc<dyn CompletionBackend>>,
) -> web::Data<Arc<ClassifierService>> {
    web::Data::new(Arc::new(ClassifierService::new(backend)))
}

fn image_analyzer(
    backend: Option<Arc<dyn CompletionBackend>>,
) -> web::Data<Arc<ImageAnalysisService>> {
    web::Data::new(Arc::new(ImageAnalysisService::new(backend)))
}

fn guidance(backend: Option<Arc<dyn CompletionBackend>>) -> web::Data<Arc<GuidanceService>> {
    web::Data::new(Arc::new(GuidanceService::new(backend)))
}

fn chatbot(backend: Option<Arc<dyn CompletionBackend>>) -> web::Data<Arc<ChatbotService>> {
    web::Data::new(Arc::new(ChatbotService::new(
        backend,
        Arc::new(IssueRepository::new(unreachable_pool())),
    )))
}

fn notifier() -> web::Data<Arc<NotificationService>> {
    web::Data::new(Arc::new(NotificationService::new(
        Arc::new(IssueRepository::new(unreachable_pool())),
        None,
        None,
        None,
        None,
    )))
}

#[actix_web::test]
async fn classify_empty_input_returns_400_without_backend_call() {
    let mut backend = MockBackend::new();
    backend.expect_complete().times(0);

    let app = test::init_service(
        App::new()
            .app_data(classifier(Some(Arc::new(backend))))
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::assist::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/classify")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "title": "   ", "description": "" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Title or description is required");
}

#[actix_web::test]
async fn classify_backend_failure_falls_back_to_keywords() {
    let mut backend = MockBackend::new();
    backend
        .expect_complete()
        .times(1)
        .returning(|_| Err(anyhow!("connection refused")));

    let app = test::init_service(
        App::new()
            .app_data(classifier(Some(Arc::new(backend))))
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::assist::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/classify")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({
                "title": "Dead body near market",
                "description": "Found this morning, needs removal"
            }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["priority"], "high");
    assert_eq!(body["reasoning"], "Keyword-based fallback classification");
    assert_eq!(body["confidence"].as_f64(), Some(0.6));
}

#[actix_web::test]
async fn classify_without_backend_uses_keyword_table() {
    let app = test::init_service(
        App::new().app_data(classifier(None)).service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                .configure(handlers::assist::register_routes),
        ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/classify")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({
                "title": "No water supply today",
                "description": "Entire colony affected since morning"
            }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["category"], "municipal");
    assert_eq!(body["subcategory"], "water");
    assert_eq!(body["priority"], "medium");
}

#[actix_web::test]
async fn analyze_image_requires_image_data() {
    let mut backend = MockBackend::new();
    backend.expect_complete().times(0);

    let app = test::init_service(
        App::new()
            .app_data(image_analyzer(Some(Arc::new(backend))))
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::assist::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/analyze-image")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "image": "" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Image data is required for analysis");
}

#[actix_web::test]
async fn analyze_image_rejects_invalid_base64() {
    let mut backend = MockBackend::new();
    backend.expect_complete().times(0);

    let app = test::init_service(
        App::new()
            .app_data(image_analyzer(Some(Arc::new(backend))))
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::assist::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/analyze-image")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "image": "!!! not base64 !!!" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Image data is not valid base64");
}

#[actix_web::test]
async fn analyze_image_without_backend_returns_fallback() {
    let app = test::init_service(
        App::new().app_data(image_analyzer(None)).service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                .configure(handlers::assist::register_routes),
        ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/analyze-image")
            .insert_header(bearer(Uuid::new_v4()))
            // "AAAA" decodes to three zero bytes.
            .set_json(json!({ "image": "AAAA", "imageType": "image/png" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["category"], "municipal");
    assert_eq!(body["isEmergency"], false);
    assert_eq!(
        body["description"],
        "Unable to analyze image. Please select category manually."
    );
}

#[actix_web::test]
async fn guidance_unknown_step_returns_400() {
    let app = test::init_service(
        App::new().app_data(guidance(None)).service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                .configure(handlers::assist::register_routes),
        ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/guidance")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "step": "teleport" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unknown guidance step: teleport");
}

#[actix_web::test]
async fn guidance_start_fallback_advances_to_category() {
    let app = test::init_service(
        App::new().app_data(guidance(None)).service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                .configure(handlers::assist::register_routes),
        ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/guidance")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "step": "start" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["nextStep"], "category");
    assert_eq!(body["suggestedActions"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["context"], json!({}));
}

#[actix_web::test]
async fn guidance_records_user_input_in_context() {
    let app = test::init_service(
        App::new().app_data(guidance(None)).service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                .configure(handlers::assist::register_routes),
        ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/guidance")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({
                "step": "category",
                "userInput": "Pothole near the school",
                "context": { "start": "Municipal issue" }
            }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["nextStep"], "description");
    assert_eq!(body["context"]["start"], "Municipal issue");
    assert_eq!(body["context"]["category"], "Pothole near the school");
}

#[actix_web::test]
async fn chat_empty_message_returns_400() {
    let mut backend = MockBackend::new();
    backend.expect_complete().times(0);

    let app = test::init_service(
        App::new()
            .app_data(chatbot(Some(Arc::new(backend))))
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::assist::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/chat")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "message": "   " }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Message is required");
}

#[actix_web::test]
async fn chat_feature_faq_needs_no_backend() {
    let mut backend = MockBackend::new();
    backend.expect_complete().times(0);

    let app = test::init_service(
        App::new()
            .app_data(chatbot(Some(Arc::new(backend))))
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::assist::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/chat")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "message": "Where do I find the status tracker?" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let response = body["response"].as_str().expect("response text");
    assert!(response.contains("Status Tracker"));
    let conversation_id = body["conversationId"].as_str().expect("conversation id");
    assert!(conversation_id.starts_with("conv_"));
}

#[actix_web::test]
async fn chat_passes_conversation_id_through() {
    let app = test::init_service(
        App::new().app_data(chatbot(None)).service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                .configure(handlers::assist::register_routes),
        ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/chat")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({
                "message": "Can I upload image evidence?",
                "conversationId": "conv_42"
            }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["conversationId"], "conv_42");
}

#[actix_web::test]
async fn protected_routes_require_a_token() {
    let app = test::init_service(
        App::new()
            .app_data(classifier(None))
            .app_data(issue_repo())
            .app_data(suggestion_repo())
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::assist::register_routes)
                    .configure(handlers::issues::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/classify")
            .set_json(json!({ "title": "Pothole", "description": "Deep one" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/issues").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn non_bearer_scheme_is_rejected() {
    let app = test::init_service(
        App::new().app_data(classifier(None)).service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                .configure(handlers::assist::register_routes),
        ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/assist/classify")
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .set_json(json!({ "title": "Pothole", "description": "Deep one" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn update_status_rejects_unknown_value() {
    // Validation fires before the repository is consulted, so the
    // unreachable pool is never touched.
    let app = test::init_service(
        App::new()
            .app_data(issue_repo())
            .app_data(suggestion_repo())
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::issues::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&format!("/api/v1/issues/{}/status", Uuid::new_v4()))
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "status": "resolvd" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unknown status: resolvd");
}

#[actix_web::test]
async fn create_issue_requires_title_and_description() {
    let app = test::init_service(
        App::new()
            .app_data(issue_repo())
            .app_data(suggestion_repo())
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::issues::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/issues")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "title": "", "description": "Overflowing drain" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Title is required");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/issues")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "title": "Overflowing drain", "description": "   " }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Description is required");
}

#[actix_web::test]
async fn create_suggestion_requires_content() {
    let app = test::init_service(
        App::new()
            .app_data(issue_repo())
            .app_data(suggestion_repo())
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                    .configure(handlers::issues::register_routes),
            ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/issues/{}/suggestions", Uuid::new_v4()))
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({ "content": "  " }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Content is required");
}

#[actix_web::test]
async fn notification_test_reports_skipped_channels() {
    let app = test::init_service(
        App::new().app_data(notifier()).service(
            web::scope("/api/v1")
                .wrap(JwtAuthMiddleware::new(TEST_SECRET.to_string()))
                .configure(handlers::notifications::register_routes),
        ),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/notifications/test")
            .insert_header(bearer(Uuid::new_v4()))
            .set_json(json!({
                "title": "Streetlight out",
                "description": "Dark corner near the park entrance",
                "category": "municipal",
                "subcategory": "streetlights",
                "priority": "medium",
                "userName": "Asha",
                "userEmail": "asha@example.com",
                "submissionTime": "2025-01-05 10:00"
            }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["smsStatus"], "skipped");
    assert_eq!(body["emailStatus"], "skipped");
}

#[actix_web::test]
async fn liveness_probe_needs_no_token() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(unreachable_pool()))
            .configure(handlers::health::register_routes),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/health/live")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["alive"], true);
}

#[actix_web::test]
async fn health_reports_unhealthy_when_database_is_down() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(unreachable_pool()))
            .configure(handlers::health::register_routes),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/health").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["service"], "complaint-service");
}

#[actix_web::test]
async fn readiness_lists_failing_postgres_check() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(unreachable_pool()))
            .configure(handlers::health::register_routes),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/health/ready")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ready"], false);
    assert_eq!(body["checks"]["postgresql"]["status"], "unhealthy");
}

#[actix_web::test]
async fn metrics_endpoint_exposes_counters() {
    metrics::observe_assist_request("classify");

    let app = test::init_service(
        App::new().route("/metrics", web::get().to(metrics::serve_metrics)),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/metrics").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let text = String::from_utf8(body.to_vec()).expect("utf8 exposition");
    assert!(text.contains("complaint_service_assist_requests_total"));
}
