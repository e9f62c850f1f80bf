use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use complaint_service::clients::{CompletionBackend, OpenAiClient, ResendClient, TwilioClient};
use complaint_service::db::{IssueRepository, SuggestionRepository};
use complaint_service::handlers;
use complaint_service::jobs::DailyDigestJob;
use complaint_service::metrics;
use complaint_service::middleware::JwtAuthMiddleware;
use complaint_service::services::{
    ChatbotService, ClassifierService, GuidanceService, ImageAnalysisService, NotificationService,
};
use complaint_service::Config;
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

/// Complaint Service
///
/// Backend for a civic complaint reporting platform: citizens file issues,
/// AI assists with categorization and guided reporting, departments are
/// alerted over SMS and email, and the community proposes resolutions.
///
/// # Routes
///
/// - `/api/v1/assist/*` - classification, image analysis, guidance, chat
/// - `/api/v1/issues/*` - complaint CRUD and per-issue suggestions
/// - `/api/v1/suggestions/*` - suggestion feed and like votes
/// - `/api/v1/notifications/*` - department alert test dispatch
#[actix_web::main]
async fn main() -> io::Result<()> {
    // Support container healthchecks via CLI subcommand: `healthcheck-http` or legacy `healthcheck`
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "healthcheck" || cmd == "healthcheck-http" {
                let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
                let url = format!("http://127.0.0.1:{}/api/v1/health", port);
                match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => return Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"));
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"));
                    }
                }
            }
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting complaint-service v{}", env!("CARGO_PKG_VERSION"));

    // Initialize database connection pool and apply migrations
    let db_pool = match PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
        tracing::error!("Database migration failed: {:#}", e);
        eprintln!("ERROR: Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Connected to database, migrations applied");

    // Optional integrations; absent credentials degrade to fallbacks
    let completion_backend: Option<Arc<dyn CompletionBackend>> = if config.openai_configured() {
        let client = OpenAiClient::new(
            config.openai_api_key.clone().unwrap_or_default(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        );
        tracing::info!(model = %config.openai_model, "OpenAI completion backend enabled");
        Some(Arc::new(client))
    } else {
        tracing::warn!("OPENAI_API_KEY not set; AI assist runs on keyword fallbacks only");
        None
    };

    let sms_client = if config.twilio_configured() {
        tracing::info!("Twilio SMS alerts enabled");
        Some(Arc::new(TwilioClient::new(
            config.twilio_account_sid.clone().unwrap_or_default(),
            config.twilio_auth_token.clone().unwrap_or_default(),
            config.twilio_from_number.clone().unwrap_or_default(),
        )))
    } else {
        tracing::warn!("Twilio credentials not set; SMS alerts disabled");
        None
    };

    let email_client = if config.resend_configured() {
        tracing::info!("Resend email alerts enabled");
        Some(Arc::new(ResendClient::new(
            config.resend_api_key.clone().unwrap_or_default(),
            config.email_from.clone(),
        )))
    } else {
        tracing::warn!("RESEND_API_KEY not set; email alerts disabled");
        None
    };

    let issue_repo = Arc::new(IssueRepository::new(db_pool.clone()));
    let suggestion_repo = Arc::new(SuggestionRepository::new(db_pool.clone()));

    let classifier = Arc::new(ClassifierService::new(completion_backend.clone()));
    let image_analysis = Arc::new(ImageAnalysisService::new(completion_backend.clone()));
    let guidance = Arc::new(GuidanceService::new(completion_backend.clone()));
    let chatbot = Arc::new(ChatbotService::new(
        completion_backend.clone(),
        issue_repo.clone(),
    ));
    let notifications = Arc::new(NotificationService::new(
        issue_repo.clone(),
        sms_client,
        email_client,
        config.alert_sms_to.clone(),
        config.oversight_email.clone(),
    ));

    let digest_job = DailyDigestJob::new(notifications.clone(), config.digest_interval_hours);

    let issue_repo_data = web::Data::new(issue_repo);
    let suggestion_repo_data = web::Data::new(suggestion_repo);
    let classifier_data = web::Data::new(classifier);
    let image_analysis_data = web::Data::new(image_analysis);
    let guidance_data = web::Data::new(guidance);
    let chatbot_data = web::Data::new(chatbot);
    let notifications_data = web::Data::new(notifications);

    let bind_address = config.bind_address();
    tracing::info!("Starting HTTP server at {}", bind_address);

    let jwt_secret = config.jwt_secret.clone();
    let allowed_origins = config.allowed_origins.clone();

    // Create HTTP server
    let server = HttpServer::new(move || {
        // Build CORS configuration
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(issue_repo_data.clone())
            .app_data(suggestion_repo_data.clone())
            .app_data(classifier_data.clone())
            .app_data(image_analysis_data.clone())
            .app_data(guidance_data.clone())
            .app_data(chatbot_data.clone())
            .app_data(notifications_data.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(metrics::serve_metrics))
            // Health check endpoints stay outside the auth scope
            .configure(handlers::health::register_routes)
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(jwt_secret.clone()))
                    .wrap(metrics::MetricsMiddleware)
                    .configure(handlers::assist::register_routes)
                    .configure(handlers::issues::register_routes)
                    .configure(handlers::suggestions::register_routes)
                    .configure(handlers::notifications::register_routes),
            )
    })
    .bind(&bind_address)?
    .workers(4)
    .run();

    let server_handle = server.handle();

    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();

    // HTTP server task
    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    // Daily digest background job
    tasks.spawn(async move {
        digest_job.run().await;
        Ok(())
    });

    let mut first_error: Option<io::Error> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(_))) => {
                        tracing::info!("Background task completed");
                    }
                    Some(Ok(Err(e))) => {
                        tracing::error!("Task returned error: {}", e);
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Task join error: {}", e);
                        if first_error.is_none() {
                            first_error = Some(io::Error::new(io::ErrorKind::Other, e.to_string()));
                        }
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                server_handle.stop(true).await;
                tasks.shutdown().await;
                break;
            }
        }
    }

    tracing::info!("Complaint-service shutting down");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
