//! Twilio SMS client
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Client for the Twilio programmable-messaging API.
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioClient {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            account_sid,
            auth_token,
            from_number,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", TWILIO_API_BASE, self.account_sid)
    }

    /// Send a single SMS. Twilio expects a form-encoded body with basic auth.
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        let form = [
            ("From", self.from_number.as_str()),
            ("To", to),
            ("Body", body),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .context("Failed to call Twilio API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "Twilio API request failed");
            anyhow::bail!("Twilio API error ({}): {}", status, error_text);
        }

        info!(to = %to, "SMS sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url_embeds_account_sid() {
        let client = TwilioClient::new(
            "AC00000000000000000000000000000000".to_string(),
            "token".to_string(),
            "+15550001111".to_string(),
        );
        assert_eq!(
            client.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC00000000000000000000000000000000/Messages.json"
        );
    }
}
