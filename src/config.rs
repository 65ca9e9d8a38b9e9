//! Configuration types.
//!
//! Everything the relay needs is read from the environment exactly once, in
//! `main`, and handed to each component as an immutable [`RelayConfig`].
//! Missing credentials are not fatal: the affected component is left
//! unconfigured and each call degrades to a logged fallback.

use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use tracing::warn;

use crate::error::ConfigError;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default OpenAI API base.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Twilio API base.
pub const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";

/// Interval between run status polls in assistant mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Maximum number of run status polls before giving up (60s at 1.5s).
pub const DEFAULT_MAX_POLLS: u32 = 40;

/// Default timeout for every outbound HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// How the relay talks to OpenAI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationMode {
    /// Single `chat/completions` call against a model.
    Completion { model: String },
    /// Thread + run flow against a pre-configured assistant.
    Assistant { assistant_id: String },
}

/// OpenAI settings. Present only when the key and a model or assistant are set.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub mode: GenerationMode,
    pub base_url: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub timeout: Duration,
}

/// Twilio WhatsApp settings. Present only when all three credentials are set.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub phone_number: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Which configuration values were supplied. Never carries the values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPresence {
    #[serde(rename = "hasOpenAIKey")]
    pub has_openai_key: bool,
    #[serde(rename = "hasOpenAIModel")]
    pub has_openai_model: bool,
    #[serde(rename = "hasOpenAIAssistant")]
    pub has_openai_assistant: bool,
    #[serde(rename = "hasTwilioSID")]
    pub has_twilio_sid: bool,
    pub has_twilio_token: bool,
    pub has_twilio_phone: bool,
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub openai: Option<OpenAiConfig>,
    pub twilio: Option<TwilioConfig>,
    /// Keyword override; `None` means the built-in list.
    pub keywords: Option<Vec<String>>,
    /// Periodic liveness log; `None` disables it.
    pub heartbeat_interval: Option<Duration>,
    pub presence: ConfigPresence,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            openai: None,
            twilio: None,
            keywords: None,
            heartbeat_interval: None,
            presence: ConfigPresence::default(),
        }
    }
}

impl RelayConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_or(
            get("HTTP_TIMEOUT_SECS"),
            "HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT.as_secs(),
        )?;
        require_nonzero("HTTP_TIMEOUT_SECS", timeout_secs)?;
        let timeout = Duration::from_secs(timeout_secs);
        let max_polls = parse_or(get("OPENAI_MAX_POLLS"), "OPENAI_MAX_POLLS", DEFAULT_MAX_POLLS)?;
        require_nonzero("OPENAI_MAX_POLLS", u64::from(max_polls))?;
        let heartbeat_secs: u64 =
            parse_or(get("HEARTBEAT_INTERVAL_SECS"), "HEARTBEAT_INTERVAL_SECS", 0)?;

        let api_key = get("OPENAI_API_KEY");
        let model = get("OPENAI_MODEL");
        let assistant_id = get("OPENAI_ASSISTANT_ID");
        let account_sid = get("TWILIO_ACCOUNT_SID");
        let auth_token = get("TWILIO_AUTH_TOKEN");
        let phone_number = get("TWILIO_PHONE_NUMBER");

        let presence = ConfigPresence {
            has_openai_key: api_key.is_some(),
            has_openai_model: model.is_some(),
            has_openai_assistant: assistant_id.is_some(),
            has_twilio_sid: account_sid.is_some(),
            has_twilio_token: auth_token.is_some(),
            has_twilio_phone: phone_number.is_some(),
        };

        let mode = match (assistant_id, model) {
            (Some(assistant_id), _) => Some(GenerationMode::Assistant { assistant_id }),
            (None, Some(model)) => Some(GenerationMode::Completion { model }),
            (None, None) => None,
        };

        let openai = match (api_key, mode) {
            (Some(key), Some(mode)) => Some(OpenAiConfig {
                api_key: SecretString::from(key),
                mode,
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                poll_interval: DEFAULT_POLL_INTERVAL,
                max_polls,
                timeout,
            }),
            _ => None,
        };

        let twilio = match (account_sid, auth_token, phone_number) {
            (Some(account_sid), Some(token), Some(phone_number)) => Some(TwilioConfig {
                account_sid,
                auth_token: SecretString::from(token),
                phone_number,
                base_url: get("TWILIO_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TWILIO_BASE_URL.to_string()),
                timeout,
            }),
            _ => None,
        };

        let keywords = get("RELAY_KEYWORDS").and_then(|raw| {
            let list: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if list.is_empty() {
                warn!("RELAY_KEYWORDS has no usable entries, using the built-in list");
                None
            } else {
                Some(list)
            }
        });

        Ok(Self {
            port,
            openai,
            twilio,
            keywords,
            heartbeat_interval: (heartbeat_secs > 0).then(|| Duration::from_secs(heartbeat_secs)),
            presence,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value:?}: {e}"),
        }),
    }
}

fn require_nonzero(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be at least 1".into(),
        });
    }
    Ok(())
}
