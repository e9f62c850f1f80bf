use serde::Deserialize;

/// Service configuration, loaded from environment variables.
///
/// Variables map 1:1 onto field names (upper-cased), e.g. `DATABASE_URL`,
/// `OPENAI_API_KEY`, `TWILIO_ACCOUNT_SID`. Integration credentials are all
/// optional; features degrade gracefully when they are absent.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string
    pub database_url: String,
    /// Secret used to verify bearer tokens
    pub jwt_secret: String,

    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    /// OpenAI-compatible completion endpoint
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Twilio SMS credentials
    #[serde(default)]
    pub twilio_account_sid: Option<String>,
    #[serde(default)]
    pub twilio_auth_token: Option<String>,
    #[serde(default)]
    pub twilio_from_number: Option<String>,
    /// Number that receives emergency alert texts
    #[serde(default)]
    pub alert_sms_to: Option<String>,

    /// Resend email credentials
    #[serde(default)]
    pub resend_api_key: Option<String>,
    #[serde(default = "default_email_from")]
    pub email_from: String,
    /// Oversight address copied on every department email
    #[serde(default)]
    pub oversight_email: Option<String>,

    /// Hours between daily digest runs
    #[serde(default = "default_digest_interval_hours")]
    pub digest_interval_hours: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> String {
    "*".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_email_from() -> String {
    "CivicConnect <onboarding@resend.dev>".to_string()
}

fn default_digest_interval_hours() -> u64 {
    24
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn openai_configured(&self) -> bool {
        self.openai_api_key
            .as_deref()
            .map(|k| !k.is_empty())
            .unwrap_or(false)
    }

    pub fn twilio_configured(&self) -> bool {
        matches!(
            (
                self.twilio_account_sid.as_deref(),
                self.twilio_auth_token.as_deref(),
                self.twilio_from_number.as_deref(),
            ),
            (Some(sid), Some(token), Some(from))
                if !sid.is_empty() && !token.is_empty() && !from.is_empty()
        )
    }

    pub fn resend_configured(&self) -> bool {
        self.resend_api_key
            .as_deref()
            .map(|k| !k.is_empty())
            .unwrap_or(false)
    }
}
