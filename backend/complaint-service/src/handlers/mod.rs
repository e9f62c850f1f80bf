/// HTTP handlers for the complaint API
///
/// This module contains handlers for:
/// - Assist: AI-backed classification, image analysis, guided reporting,
///   and the help chatbot
/// - Issues: create, list, read, update status, delete complaints
/// - Suggestions: community-proposed resolutions with like votes
/// - Notifications: department alert test dispatch
/// - Health: liveness and readiness probes
///
/// Each submodule exposes a `register_routes` function; `main` mounts the
/// authenticated ones under `/api/v1` behind the JWT middleware.
pub mod assist;
pub mod health;
pub mod issues;
pub mod notifications;
pub mod suggestions;
