//! Configuration for Telegram API credentials and the channel list
//!
//! Loads configuration from config.yml file

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const SESSION_NAME: &str = "archiver_session";
pub const MESSAGES_DIR: &str = "data/raw/telegram_messages";
pub const IMAGES_DIR: &str = "data/raw/telegram_images";
pub const LOG_FILE: &str = "archiver.log";

/// Which message attachments get downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPolicy {
    /// Download every attachment the client can fetch
    All,
    /// Download photos only
    ImagesOnly,
}

impl MediaPolicy {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "all" | "any" => Ok(Self::All),
            "images_only" | "images-only" | "images" | "photos" => Ok(Self::ImagesOnly),
            other => Err(Error::InvalidArgument(format!(
                "Unsupported media policy '{}'. Use all|images_only",
                other
            ))),
        }
    }
}

/// Order in which fetched messages are written to the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOrder {
    /// The client's delivery order
    NewestFirst,
    /// Chronological: collected list is reversed before writing
    OldestFirst,
}

impl IterationOrder {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "newest_first" | "newest-first" | "newest" => Ok(Self::NewestFirst),
            "oldest_first" | "oldest-first" | "oldest" | "reverse" => Ok(Self::OldestFirst),
            other => Err(Error::InvalidArgument(format!(
                "Unsupported iteration order '{}'. Use newest_first|oldest_first",
                other
            ))),
        }
    }
}

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    telegram: Option<TelegramConfig>,
    archive: Option<ArchiveConfig>,
    log: Option<LogConfig>,
    channels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TelegramConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    api_id: Option<String>,
    api_hash: Option<String>,
    phone: Option<String>,
    session_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArchiveConfig {
    media_policy: Option<String>,
    iteration_order: Option<String>,
    messages_dir: Option<PathBuf>,
    images_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct LogConfig {
    file: Option<PathBuf>,
    console: Option<bool>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub phone: String,
    pub api_id: i32,
    pub api_hash: String,
    pub session_name: String,
    pub channels: Vec<String>,
    pub media_policy: MediaPolicy,
    pub iteration_order: IterationOrder,
    pub messages_dir: PathBuf,
    pub images_dir: PathBuf,
    pub log_file: PathBuf,
    pub log_console: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults.
    /// Environment variables take precedence over config.yml values.
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        // If value from YAML looks like ${...}, try env var
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                // Extract var name from ${VAR_NAME}
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            }
        }
        // Also check explicit env_key as fallback
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        value.unwrap_or_default()
    }

    /// Resolve an integer value from string config or env var
    fn resolve_env_i32(value: Option<String>, env_key: &str) -> i32 {
        // If value from YAML looks like ${...}, try env var
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    if let Ok(parsed) = env_val.parse::<i32>() {
                        return parsed;
                    }
                }
            }
            // Try parsing directly if it's a number
            if let Ok(parsed) = v.parse::<i32>() {
                return parsed;
            }
        }
        // Fallback: check explicit env_key
        if let Ok(env_val) = std::env::var(env_key) {
            if let Ok(parsed) = env_val.parse::<i32>() {
                return parsed;
            }
        }
        0
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, String> {
        // Load .env file first
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        let telegram = yaml.telegram.unwrap_or(TelegramConfig {
            api_id: None,
            api_hash: None,
            phone: None,
            session_name: None,
        });

        let archive = yaml.archive.unwrap_or(ArchiveConfig {
            media_policy: None,
            iteration_order: None,
            messages_dir: None,
            images_dir: None,
        });

        let log = yaml.log.unwrap_or(LogConfig {
            file: None,
            console: None,
        });

        let media_policy = match archive.media_policy {
            Some(raw) => MediaPolicy::parse(&raw).map_err(|e| e.to_string())?,
            None => MediaPolicy::All,
        };

        let iteration_order = match archive.iteration_order {
            Some(raw) => IterationOrder::parse(&raw).map_err(|e| e.to_string())?,
            None => IterationOrder::NewestFirst,
        };

        // Resolve credentials with env var precedence
        let api_id = Self::resolve_env_i32(telegram.api_id, "TELEGRAM_API_ID");
        let api_hash = Self::resolve_env_string(telegram.api_hash, "TELEGRAM_API_HASH");
        let phone = Self::resolve_env_string(telegram.phone, "TELEGRAM_PHONE");

        Ok(Self {
            phone,
            api_id,
            api_hash,
            session_name: telegram
                .session_name
                .unwrap_or_else(|| SESSION_NAME.to_string()),
            channels: yaml.channels.unwrap_or_default(),
            media_policy,
            iteration_order,
            messages_dir: archive
                .messages_dir
                .unwrap_or_else(|| PathBuf::from(MESSAGES_DIR)),
            images_dir: archive
                .images_dir
                .unwrap_or_else(|| PathBuf::from(IMAGES_DIR)),
            log_file: log.file.unwrap_or_else(|| PathBuf::from(LOG_FILE)),
            log_console: log.console.unwrap_or(true),
        })
    }

    /// Create config with empty defaults (fallback)
    /// User MUST provide config.yml with actual credentials
    fn defaults() -> Self {
        Self {
            phone: String::new(),
            api_id: 0,
            api_hash: String::new(),
            session_name: SESSION_NAME.to_string(),
            channels: Vec::new(),
            media_policy: MediaPolicy::All,
            iteration_order: IterationOrder::NewestFirst,
            messages_dir: PathBuf::from(MESSAGES_DIR),
            images_dir: PathBuf::from(IMAGES_DIR),
            log_file: PathBuf::from(LOG_FILE),
            log_console: true,
        }
    }

    /// Path of the session token file reused across runs
    pub fn session_file(&self) -> String {
        format!("{}.session", self.session_name)
    }

    /// Path of the lock file guarding the session
    pub fn lock_file(&self) -> String {
        format!("{}.lock", self.session_name)
    }
}
