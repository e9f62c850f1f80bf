//! Resend transactional-email client
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Client for the Resend email API.
pub struct ResendClient {
    client: Client,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
}

impl ResendClient {
    pub fn new(api_key: String, from: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            from,
        }
    }

    /// Send a plain-text email to one or more recipients.
    pub async fn send_email(&self, to: &[String], subject: &str, text: &str) -> Result<()> {
        let body = EmailRequest {
            from: &self.from,
            to,
            subject,
            text,
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to call Resend API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "Resend API request failed");
            anyhow::bail!("Resend API error ({}): {}", status, error_text);
        }

        info!(recipients = to.len(), subject = %subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_request_shape() {
        let to = vec!["roads@example.gov".to_string(), "oversight@example.gov".to_string()];
        let body = EmailRequest {
            from: "CivicConnect <onboarding@resend.dev>",
            to: &to,
            subject: "New complaint",
            text: "A pothole was reported.",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["from"], "CivicConnect <onboarding@resend.dev>");
        assert_eq!(value["to"].as_array().unwrap().len(), 2);
        assert_eq!(value["text"], "A pothole was reported.");
        assert!(value.get("html").is_none());
    }
}
