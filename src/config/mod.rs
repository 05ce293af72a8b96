//! Configuration management for MindMate
//!
//! Values resolve env > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::chat::registry::DEFAULT_MAX_SESSIONS;
use crate::chat::{ChatSettings, DEFAULT_SYSTEM_PROMPT, MAX_RECENT_MESSAGES};
use crate::{Error, Result};

use file::MindmateConfigFile;

/// Default API server port
pub const DEFAULT_PORT: u16 = 18790;

/// MindMate configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat endpoint configuration
    pub chat: ChatConfig,

    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Path to data directory (database, cache, etc)
    pub data_dir: PathBuf,

    /// `SQLite` database path
    pub db_path: PathBuf,
}

/// Chat endpoint configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Proxy or upstream messages URL
    pub endpoint_url: Option<String>,

    /// Endpoint credential, sent as `x-api-key`
    pub api_key: Option<SecretString>,

    /// LLM model identifier
    pub model: String,

    /// Output length bound
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Assistant persona prompt
    pub system_prompt: String,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let settings = ChatSettings::default();
        Self {
            endpoint_url: None,
            api_key: None,
            model: settings.model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            system_prompt: settings.system_prompt,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ChatConfig {
    /// Pipeline settings derived from this configuration
    #[must_use]
    pub fn settings(&self) -> ChatSettings {
        ChatSettings {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system_prompt: self.system_prompt.clone(),
            max_recent_messages: MAX_RECENT_MESSAGES,
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Global requests-per-minute cap; `None` disables limiting
    pub rate_limit_rpm: Option<u32>,

    /// Chat pipelines kept in memory before the least recently used is dropped
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            rate_limit_rpm: None,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl Config {
    /// Load configuration from the environment and the TOML config file
    ///
    /// # Errors
    ///
    /// Returns error if a set value cannot be parsed
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if a set value cannot be parsed
    pub fn resolve(fc: MindmateConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = ChatConfig::default();

        // Chat endpoint (env > toml > default)
        let endpoint_url = env("MINDMATE_ENDPOINT_URL").or(fc.chat.endpoint_url);
        let api_key = env("MINDMATE_API_KEY")
            .or_else(|| env("ANTHROPIC_API_KEY"))
            .or(fc.chat.api_key)
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        let model = env("MINDMATE_MODEL")
            .or(fc.chat.model)
            .unwrap_or(defaults.model);
        let max_tokens = parse_env(&env, "MINDMATE_MAX_TOKENS")?
            .or(fc.chat.max_tokens)
            .unwrap_or(defaults.max_tokens);
        let temperature = parse_env(&env, "MINDMATE_TEMPERATURE")?
            .or(fc.chat.temperature)
            .unwrap_or(defaults.temperature);
        if !(0.0..=1.0).contains(&temperature) {
            return Err(Error::Config(format!(
                "temperature must be between 0 and 1, got {temperature}"
            )));
        }
        let system_prompt = env("MINDMATE_SYSTEM_PROMPT")
            .or(fc.chat.system_prompt)
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let request_timeout = parse_env(&env, "MINDMATE_TIMEOUT_SECS")?
            .or(fc.chat.timeout_secs)
            .map_or(defaults.request_timeout, Duration::from_secs);

        if endpoint_url.is_none() {
            tracing::warn!("MINDMATE_ENDPOINT_URL not set, chat requests will fail");
        }
        if api_key.is_none() {
            tracing::warn!("MINDMATE_API_KEY not set, chat requests will fail");
        }

        // API server (env > toml > default)
        let port = match parse_env(&env, "MINDMATE_PORT")? {
            Some(port) => Some(port),
            None => parse_env(&env, "PORT")?,
        }
        .or(fc.server.port)
        .unwrap_or(DEFAULT_PORT);
        let rate_limit_rpm = parse_env(&env, "MINDMATE_RATE_LIMIT_RPM")?
            .or(fc.server.rate_limit_rpm)
            .filter(|rpm| *rpm > 0);
        let max_sessions = parse_env(&env, "MINDMATE_MAX_SESSIONS")?
            .or(fc.server.max_sessions)
            .unwrap_or(DEFAULT_MAX_SESSIONS);

        // Data directory (~/.local/share/mindmate on Linux)
        let data_dir = env("MINDMATE_DATA_DIR").map_or_else(
            || {
                directories::BaseDirs::new()
                    .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("mindmate"))
            },
            PathBuf::from,
        );
        let db_path = env("MINDMATE_DB_PATH")
            .or(fc.storage.db_path)
            .map_or_else(|| data_dir.join("mindmate.db"), PathBuf::from);

        Ok(Self {
            chat: ChatConfig {
                endpoint_url,
                api_key,
                model,
                max_tokens,
                temperature,
                system_prompt,
                request_timeout,
            },
            server: ServerConfig {
                port,
                rate_limit_rpm,
                max_sessions,
            },
            data_dir,
            db_path,
        })
    }
}

/// Parse an optional env value, failing loudly on garbage
fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {key}={raw}: {e}")))
        })
        .transpose()
}
