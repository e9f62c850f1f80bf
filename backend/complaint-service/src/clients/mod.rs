//! Outbound HTTP clients for third-party integrations.
//!
//! Each client is optional at runtime: when its credentials are missing the
//! service starts without it and the dependent feature degrades (deterministic
//! fallbacks for AI, "skipped" channel status for notifications).

pub mod openai;
pub mod resend;
pub mod twilio;

pub use openai::OpenAiClient;
pub use resend::ResendClient;
pub use twilio::TwilioClient;

use async_trait::async_trait;

/// User-turn content of a completion request.
#[derive(Debug, Clone)]
pub enum UserContent {
    Text(String),
    /// Text prompt paired with an inline `data:` image URL.
    TextWithImage { text: String, image_data_url: String },
}

/// A single-turn chat completion: one system message, one user message.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: UserContent,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Abstraction over the chat-completion provider so services can be tested
/// without network access.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Returns the assistant's reply text for a single-turn exchange.
    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<String>;
}
