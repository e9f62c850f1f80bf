/// Complaint Service Library
///
/// Backend for the CivicConnect civic-complaint platform: issue and suggestion
/// CRUD, AI-assisted complaint intake (classification, image analysis, guided
/// reporting, chatbot), and department notification fan-out.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers
/// - `models`: Domain data structures
/// - `services`: Business logic layer
/// - `db`: Database access layer and repositories
/// - `clients`: Outbound HTTP clients (OpenAI, Twilio, Resend)
/// - `middleware`: JWT authentication middleware
/// - `jobs`: Background jobs (daily digest)
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Observability and metrics collection
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
