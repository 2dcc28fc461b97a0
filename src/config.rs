//! CLI flags, environment, and `config.toml` merged into one runtime configuration.
//!
//! Precedence is CLI flag (or its env var) over the persisted file over built-in defaults.
//! The persisted file lives in `DRIVEBOT_CONFIG_DIR` when set, otherwise in
//! `~/.config/drivebot/`.

use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::markers::{MarkerFileError, MarkerTable};

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:5000/session";
pub const DEFAULT_SUBMIT_URL: &str = "http://127.0.0.1:5000/student/register";
pub const DEFAULT_GREETING: &str =
    "👋 Hi! I'm DriveBot, your virtual driving assistant. How can I assist you today?";
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 10_000;

const CONFIG_FILE: &str = "config.toml";
const MARKERS_FILE: &str = "markers.yaml";
const CONFIG_DIR_ENV: &str = "DRIVEBOT_CONFIG_DIR";

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "drivebot",
    about = "Chat-driven registration intake with live form sync",
    author,
    version
)]
pub struct AppConfig {
    /// WebSocket URL of the conversation backend
    #[arg(long = "server-url", env = "DRIVEBOT_SERVER_URL")]
    pub server_url: Option<String>,

    /// HTTP endpoint that accepts completed registrations
    #[arg(long = "submit-url", env = "DRIVEBOT_SUBMIT_URL")]
    pub submit_url: Option<String>,

    /// Identifier the backend uses to key this conversation
    #[arg(long = "user-id", env = "DRIVEBOT_USER_ID")]
    pub user_id: Option<String>,

    /// YAML marker table (prompt and completion phrases)
    #[arg(long = "markers")]
    pub markers: Option<PathBuf>,

    /// Opening bot message shown before the backend speaks
    #[arg(long = "greeting")]
    pub greeting: Option<String>,

    /// Start with an empty chat log
    #[arg(long = "no-greeting", default_value_t = false)]
    pub no_greeting: bool,

    /// Registration submit timeout (ms)
    #[arg(long = "submit-timeout-ms")]
    pub submit_timeout_ms: Option<u64>,

    /// Write JSON trace logs
    #[arg(long = "logs", default_value_t = false)]
    pub logs: bool,

    /// Include chat text, transcripts, and field values in logs
    #[arg(long = "log-content", default_value_t = false)]
    pub log_content: bool,

    /// Disable all logging (overrides --logs)
    #[arg(long = "no-logs", default_value_t = false)]
    pub no_logs: bool,

    /// Print the resolved marker table as YAML and exit
    #[arg(long = "print-markers", default_value_t = false)]
    pub print_markers: bool,
}

/// Values persisted in `config.toml`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub submit_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub markers: Option<PathBuf>,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub submit_timeout_ms: Option<u64>,
}

/// Fully resolved settings the runtime consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub server_url: String,
    pub submit_url: String,
    pub user_id: String,
    pub markers_path: Option<PathBuf>,
    pub greeting: Option<String>,
    pub submit_timeout: Duration,
    pub logs: bool,
    pub log_content: bool,
    pub no_logs: bool,
    pub print_markers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    InvalidUrl { key: &'static str, value: String },
    EmptyUserId,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "config IO error: {msg}"),
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::InvalidUrl { key, value } => write!(f, "invalid {key}: {value}"),
            Self::EmptyUserId => write!(f, "user id cannot be blank"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Resolve the config directory (`DRIVEBOT_CONFIG_DIR` or `~/.config/drivebot`).
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::config_dir().map(|dir| dir.join("drivebot"))
}

/// Load `config.toml` from the config directory. A missing file yields defaults.
pub fn load_user_config() -> Result<UserConfig, ConfigError> {
    match config_dir() {
        Some(dir) => load_user_config_from(&dir.join(CONFIG_FILE)),
        None => Ok(UserConfig::default()),
    }
}

pub fn load_user_config_from(path: &Path) -> Result<UserConfig, ConfigError> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    parse_user_config(&contents)
}

fn parse_user_config(contents: &str) -> Result<UserConfig, ConfigError> {
    toml::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))
}

impl AppConfig {
    /// Merge CLI values over the persisted file and validate the result.
    pub fn resolve(self, user: &UserConfig) -> Result<RuntimeConfig, ConfigError> {
        let server_url = pick(self.server_url, user.server_url.as_ref())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        require_scheme("server url", &server_url, &["ws://", "wss://"])?;

        let submit_url = pick(self.submit_url, user.submit_url.as_ref())
            .unwrap_or_else(|| DEFAULT_SUBMIT_URL.to_string());
        require_scheme("submit url", &submit_url, &["http://", "https://"])?;

        let user_id = match pick(self.user_id, user.user_id.as_ref()) {
            Some(id) if id.trim().is_empty() => return Err(ConfigError::EmptyUserId),
            Some(id) => id.trim().to_string(),
            None => generated_user_id(),
        };

        let markers_path = self
            .markers
            .or_else(|| user.markers.clone())
            .or_else(|| default_markers_path().filter(|path| path.exists()));

        let greeting = if self.no_greeting {
            None
        } else {
            Some(
                pick(self.greeting, user.greeting.as_ref())
                    .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            )
        };

        let submit_timeout_ms = self
            .submit_timeout_ms
            .or(user.submit_timeout_ms)
            .unwrap_or(DEFAULT_SUBMIT_TIMEOUT_MS);

        Ok(RuntimeConfig {
            server_url,
            submit_url,
            user_id,
            markers_path,
            greeting,
            submit_timeout: Duration::from_millis(submit_timeout_ms),
            logs: self.logs,
            log_content: self.log_content,
            no_logs: self.no_logs,
            print_markers: self.print_markers,
        })
    }
}

impl RuntimeConfig {
    pub(crate) fn logging_enabled(&self) -> bool {
        self.logs && !self.no_logs
    }

    /// Marker table from the configured file, or the built-in table.
    pub fn marker_table(&self) -> Result<MarkerTable, MarkerFileError> {
        match &self.markers_path {
            Some(path) => MarkerTable::load_from_path(path),
            None => Ok(MarkerTable::builtin()),
        }
    }
}

fn pick(cli: Option<String>, file: Option<&String>) -> Option<String> {
    cli.or_else(|| file.cloned())
}

fn require_scheme(key: &'static str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let lowered = value.trim().to_ascii_lowercase();
    let valid = schemes
        .iter()
        .any(|scheme| lowered.starts_with(scheme) && lowered.len() > scheme.len());
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            key,
            value: value.to_string(),
        })
    }
}

fn default_markers_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(MARKERS_FILE))
}

fn generated_user_id() -> String {
    format!(
        "guest-{:x}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    )
}

#[cfg(test)]
pub(crate) fn env_lock() -> &'static std::sync::Mutex<()> {
    static LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    LOCK.get_or_init(|| std::sync::Mutex::new(()))
}
