//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;

/// Bot configuration, read from the process environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token. Without one the bot runs on the CLI channel.
    pub bot_token: Option<SecretString>,
    /// Usernames or numeric ids allowed to talk to the bot ("*" = everyone).
    pub allowed_users: Vec<String>,
    /// Long-poll timeout passed to getUpdates.
    pub poll_timeout_secs: u64,
    /// Sessions idle longer than this are dropped. `None` disables the sweep.
    pub session_idle_timeout: Option<Duration>,
    /// Directory for daily-rolling log files, in addition to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_users: vec!["*".to_string()],
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            session_idle_timeout: Some(Duration::from_secs(DEFAULT_SESSION_IDLE_SECS)),
            log_dir: None,
        }
    }
}

impl BotConfig {
    /// Load configuration from environment variables, after reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = non_empty("TELEGRAM_BOT_TOKEN")
            .or_else(|| non_empty("TOKEN"))
            .map(SecretString::from);

        let allowed_users: Vec<String> = non_empty("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let poll_timeout_secs = parse_u64(&non_empty, "TURNOUT_POLL_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_POLL_TIMEOUT_SECS);

        let idle_secs = parse_u64(&non_empty, "TURNOUT_SESSION_IDLE_SECS")?
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS);
        let session_idle_timeout = (idle_secs > 0).then(|| Duration::from_secs(idle_secs));

        let log_dir = non_empty("TURNOUT_LOG_DIR").map(PathBuf::from);

        Ok(Self {
            bot_token,
            allowed_users,
            poll_timeout_secs,
            session_idle_timeout,
            log_dir,
        })
    }

    /// Human-readable description of the allowlist.
    pub fn allowed_users_display(&self) -> String {
        if self.allowed_users.iter().any(|u| u == "*") {
            "everyone".to_string()
        } else if self.allowed_users.is_empty() {
            "none (deny all)".to_string()
        } else {
            self.allowed_users.join(", ")
        }
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}
