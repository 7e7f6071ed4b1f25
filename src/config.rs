//! Configuration types for the motivator bot.

use crate::error::{BotError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Telegram bot access token. Required.
    pub bot_token: String,
    /// Run mode; controls default log verbosity.
    pub mode: RunMode,
    /// SQLite database holding user preferences and the delivery log.
    pub db_path: PathBuf,
    /// JSON catalog of motivational texts.
    pub texts_path: PathBuf,
    /// Reminder scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Telegram transport settings.
    pub telegram: TelegramConfig,
    /// Conversation session storage.
    pub sessions: SessionConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            mode: RunMode::Dev,
            db_path: PathBuf::from("./data/bot.db"),
            texts_path: PathBuf::from("./data/texts.json"),
            scheduler: SchedulerConfig::default(),
            telegram: TelegramConfig::default(),
            sessions: SessionConfig::default(),
        }
    }
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Dev,
    Prod,
}

impl RunMode {
    /// Parse a mode from its wire-format string.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dev" => Some(Self::Dev),
            "prod" => Some(Self::Prod),
            _ => None,
        }
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Self::Dev => "motivator=debug,reqwest=warn",
            Self::Prod => "motivator=info,reqwest=warn",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dev => f.write_str("dev"),
            Self::Prod => f.write_str("prod"),
        }
    }
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between due-user polls.
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
        }
    }
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// API root, overridable for tests and self-hosted Bot API servers.
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_owned(),
            poll_timeout_secs: 30,
        }
    }
}

/// Conversation session storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Persist sessions in the database instead of process memory.
    pub persist: bool,
    /// Lifetime of a persisted session row.
    pub ttl_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist: false,
            ttl_secs: 86_400,
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| BotError::Config(e.to_string()))
    }

    /// Overlay `BOT_TOKEN`, `MODE`, `DB_PATH` and `TEXTS_PATH` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Overlay settings from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BOT_TOKEN") {
            self.bot_token = token.trim().to_owned();
        }
        if let Some(mode) = lookup("MODE") {
            self.mode = RunMode::parse(&mode).ok_or_else(|| {
                BotError::Config(format!("invalid MODE `{mode}`; expected dev or prod"))
            })?;
        }
        if let Some(path) = lookup("DB_PATH").filter(|p| !p.trim().is_empty()) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("TEXTS_PATH").filter(|p| !p.trim().is_empty()) {
            self.texts_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Check required settings.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Config`] when the token is missing or intervals are zero.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(BotError::Config(
                "missing required setting BOT_TOKEN".to_owned(),
            ));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(BotError::Config(
                "scheduler.poll_interval_secs must be positive".to_owned(),
            ));
        }
        if self.sessions.persist && self.sessions.ttl_secs <= 0 {
            return Err(BotError::Config(
                "sessions.ttl_secs must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/motivator/config.toml`.
    pub fn default_config_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("motivator").join("config.toml"),
            None => PathBuf::from("/tmp/motivator-config/config.toml"),
        }
    }
}
