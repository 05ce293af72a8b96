//! TOML configuration file loading
//!
//! Supports `~/.config/mindmate/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct MindmateConfigFile {
    /// Chat endpoint and generation settings
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageFileConfig,
}

/// Chat endpoint configuration
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    /// Proxy or upstream messages URL
    pub endpoint_url: Option<String>,

    /// Endpoint credential
    pub api_key: Option<String>,

    /// Model identifier (e.g. "claude-3-opus-20240229")
    pub model: Option<String>,

    pub max_tokens: Option<u32>,

    pub temperature: Option<f32>,

    /// System prompt override
    pub system_prompt: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Global requests-per-minute cap for the HTTP API
    pub rate_limit_rpm: Option<u32>,

    /// Chat pipelines kept in memory at once
    pub max_sessions: Option<usize>,
}

/// Storage configuration
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// `SQLite` database path
    pub db_path: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `MindmateConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> MindmateConfigFile {
    config_file_path().map_or_else(MindmateConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Returns `MindmateConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_from(path: &Path) -> MindmateConfigFile {
    if !path.exists() {
        return MindmateConfigFile::default();
    }

    match parse_file(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            MindmateConfigFile::default()
        }
    }
}

/// Read and parse a TOML config file
///
/// # Errors
///
/// Returns `Error::Io` if the file can't be read and `Error::Toml` if it
/// isn't valid config
pub fn parse_file(path: &Path) -> Result<MindmateConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `$MINDMATE_CONFIG` or `~/.config/mindmate/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("MINDMATE_CONFIG") {
        return Some(PathBuf::from(path));
    }

    directories::BaseDirs::new().map(|d| d.config_dir().join("mindmate").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let config: MindmateConfigFile = toml::from_str(
            r#"
            [chat]
            endpoint_url = "https://proxy.example.com/api/chat"
            temperature = 0.4

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(
            config.chat.endpoint_url.as_deref(),
            Some("https://proxy.example.com/api/chat")
        );
        assert_eq!(config.chat.temperature, Some(0.4));
        assert_eq!(config.chat.model, None);
        assert_eq!(config.server.port, Some(9000));
        assert!(config.storage.db_path.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_from(Path::new("/nonexistent/mindmate/config.toml"));
        assert!(config.chat.api_key.is_none());
    }

    #[test]
    fn invalid_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[chat\nbroken").unwrap();

        let config = load_from(&path);
        assert!(config.chat.endpoint_url.is_none());

        assert!(matches!(parse_file(&path), Err(crate::Error::Toml(_))));
    }

    #[test]
    fn parse_file_reads_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nmax_sessions = 16\n").unwrap();

        let config = parse_file(&path).unwrap();
        assert_eq!(config.server.max_sessions, Some(16));
    }
}
