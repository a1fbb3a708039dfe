use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default Anthropic endpoint used when `ANTHROPIC_BASE_URL` is unset.
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
/// Default chat model identifier.
pub const DEFAULT_CHAT_MODEL: &str = "claude-sonnet-4-20250514";
/// Default cap on reply tokens requested from the completion API.
pub const DEFAULT_MAX_REPLY_TOKENS: u32 = 1000;
/// Default number of chat messages replayed to the model on each turn.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
/// Default per-document character cap applied while building prompt context.
pub const DEFAULT_DOCUMENT_CHAR_LIMIT: usize = 8000;
/// Default upload body limit (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
/// Default completion request timeout in seconds.
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 120;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the PDF chat server.
///
/// Built once at startup and handed to the services that need it; nothing reads the
/// environment after that point.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key sent to the Anthropic Messages API.
    pub anthropic_api_key: String,
    /// Base URL of the Anthropic API.
    pub anthropic_base_url: String,
    /// Model identifier used for chat completions.
    pub chat_model: String,
    /// Maximum number of tokens requested for each reply.
    pub max_reply_tokens: u32,
    /// Number of recent chat messages included with each request.
    pub history_limit: usize,
    /// Maximum characters of each document included in the system prompt.
    pub document_char_limit: usize,
    /// Location of the SQLite database file.
    pub database_path: PathBuf,
    /// Directory that receives uploaded files.
    pub media_root: PathBuf,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: usize,
    /// Timeout applied to each completion request.
    pub completion_timeout_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset so that an empty line in `.env` falls back to the
    /// default instead of failing to parse.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            anthropic_api_key: get("ANTHROPIC_API_KEY")
                .ok_or_else(|| ConfigError::MissingVariable("ANTHROPIC_API_KEY".to_string()))?,
            anthropic_base_url: get("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            chat_model: get("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            max_reply_tokens: parse_positive_or(
                "MAX_REPLY_TOKENS",
                get("MAX_REPLY_TOKENS"),
                DEFAULT_MAX_REPLY_TOKENS,
            )?,
            history_limit: parse_positive_or(
                "HISTORY_LIMIT",
                get("HISTORY_LIMIT"),
                DEFAULT_HISTORY_LIMIT,
            )?,
            document_char_limit: parse_or(
                "DOCUMENT_CHAR_LIMIT",
                get("DOCUMENT_CHAR_LIMIT"),
                DEFAULT_DOCUMENT_CHAR_LIMIT,
            )?,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("pdf-chat.db")),
            media_root: get("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            max_upload_bytes: parse_positive_or(
                "MAX_UPLOAD_BYTES",
                get("MAX_UPLOAD_BYTES"),
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            completion_timeout_secs: parse_positive_or(
                "COMPLETION_TIMEOUT_SECS",
                get("COMPLETION_TIMEOUT_SECS"),
                DEFAULT_COMPLETION_TIMEOUT_SECS,
            )?,
            server_port: get("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but zero is rejected.
fn parse_positive_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
{
    let value = parse_or(key, raw, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }
    Ok(value)
}

/// Read `.env` (when present) and build the configuration from the environment.
pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        base_url = %config.anthropic_base_url,
        model = %config.chat_model,
        database = %config.database_path.display(),
        media_root = %config.media_root.display(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}
