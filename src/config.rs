//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::profile::UserId;
use crate::subscription::Currency;

/// Default Gemini model used for meal plan generation.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Bot runtime configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot name for identification in logs.
    pub name: String,
    /// Path to the libSQL database file.
    pub db_path: PathBuf,
    /// Upper bound on a single provider call.
    pub generation_timeout: Duration,
    /// Dialogue sessions idle for longer than this are evicted.
    pub session_idle_timeout: Duration,
    /// How often the idle sweep runs.
    pub session_sweep_interval: Duration,
    /// Currency used for the plan keyboard and invoices.
    pub currency: Currency,
    /// Port for the status API, if enabled.
    pub http_port: Option<u16>,
    /// Directory for rolling log files, if enabled.
    pub log_dir: Option<PathBuf>,
    /// Whether to attach the stdin CLI channel.
    pub cli_enabled: bool,
    /// User id the CLI channel acts as.
    pub cli_user_id: UserId,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "mealplan-bot".to_string(),
            db_path: PathBuf::from("./data/mealbot.db"),
            generation_timeout: Duration::from_secs(90),
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
            session_sweep_interval: Duration::from_secs(600), // 10 minutes
            currency: Currency::Rub,
            http_port: None,
            log_dir: None,
            cli_enabled: true,
            cli_user_id: 0,
        }
    }
}

impl BotConfig {
    /// Build from `MEALBOT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_path = std::env::var("MEALBOT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let generation_timeout = parse_env::<u64>("MEALBOT_GENERATION_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.generation_timeout);

        let session_idle_timeout = parse_env::<u64>("MEALBOT_SESSION_IDLE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_idle_timeout);

        let currency = match std::env::var("MEALBOT_CURRENCY") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MEALBOT_CURRENCY".into(),
                message: format!("unsupported currency '{raw}' (expected RUB or UAH)"),
            })?,
            Err(_) => defaults.currency,
        };

        let http_port = parse_env::<u16>("MEALBOT_HTTP_PORT")?;
        let log_dir = std::env::var("MEALBOT_LOG_DIR").ok().map(PathBuf::from);
        let cli_enabled = std::env::var("MEALBOT_CLI")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(defaults.cli_enabled);
        let cli_user_id =
            parse_env::<UserId>("MEALBOT_CLI_USER_ID")?.unwrap_or(defaults.cli_user_id);

        Ok(Self {
            db_path,
            generation_timeout,
            session_idle_timeout,
            currency,
            http_port,
            log_dir,
            cli_enabled,
            cli_user_id,
            ..defaults
        })
    }
}

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    /// `GEMINI_API_KEY` is required; model and base URL have defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".into()))?;
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());

        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Telegram channel configuration. `None` when no bot token is set.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub allowed_users: Vec<String>,
    pub payment_token: Option<String>,
}

impl TelegramConfig {
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;

        let allowed_users: Vec<String> = std::env::var("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let payment_token = std::env::var("TELEGRAM_PAYMENT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        Some(Self {
            bot_token,
            allowed_users,
            payment_token,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = BotConfig::default();
        assert_eq!(config.generation_timeout, Duration::from_secs(90));
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3600));
        assert_eq!(config.currency, Currency::Rub);
        assert!(config.http_port.is_none());
        assert!(config.cli_enabled);
    }

    #[test]
    fn parse_env_reports_bad_values() {
        // SAFETY: This test owns this variable name; no other test reads it.
        unsafe { std::env::set_var("MEALBOT_TEST_PARSE_PORT", "not-a-port") };
        let result = parse_env::<u16>("MEALBOT_TEST_PARSE_PORT");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        unsafe { std::env::remove_var("MEALBOT_TEST_PARSE_PORT") };
    }

    #[test]
    fn parse_env_missing_is_none() {
        // SAFETY: This test owns this variable name; no other test reads it.
        unsafe { std::env::remove_var("MEALBOT_TEST_MISSING_VALUE") };
        let result = parse_env::<u64>("MEALBOT_TEST_MISSING_VALUE").unwrap();
        assert!(result.is_none());
    }
}
