// Configuration loading and parsing (client.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use codenames_core::command::WireFormat;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// client.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base for websocket URLs, e.g. `ws://localhost:8080`.
    pub ws_base_url: String,
    /// Base for the session directory, e.g. `http://localhost:8080`.
    pub directory_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub reconnect_interval_ms: u64,
    pub connect_timeout_secs: u64,
    /// 0 disables heartbeats.
    #[serde(default)]
    pub heartbeat_interval_secs: u64,
    #[serde(default)]
    pub wire_format: WireFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "codenames=info,warn".into(),
        }
    }
}

impl Config {
    pub fn ws_base_url(&self) -> Result<Url, ConfigError> {
        parse_url("server.ws_base_url", &self.server.ws_base_url)
    }

    pub fn directory_url(&self) -> Result<Url, ConfigError> {
        parse_url("server.directory_url", &self.server.directory_url)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.connection.reconnect_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.connect_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        match self.connection.heartbeat_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/client.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()`.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

const CONFIG_FILE: &str = "client.toml";

/// Copy `defaults/client.toml` to `config/client.toml` unless a config is
/// already there. Returns the path written, if any.
pub fn ensure_client_toml(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/{CONFIG_FILE} and no defaults/{CONFIG_FILE} under {}",
                base_dir.display()
            ),
        });
    }

    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(copy_err)?;
    }
    std::fs::copy(&source, &target).map_err(copy_err)?;

    Ok(Some(target))
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_client_toml(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::ValidationError {
        field: field.into(),
        message: format!("invalid url `{raw}`: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let ws = config.ws_base_url()?;
    if !matches!(ws.scheme(), "ws" | "wss") {
        return Err(ConfigError::ValidationError {
            field: "server.ws_base_url".into(),
            message: format!("scheme must be ws or wss, got {}", ws.scheme()),
        });
    }

    let directory = config.directory_url()?;
    if !matches!(directory.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError {
            field: "server.directory_url".into(),
            message: format!("scheme must be http or https, got {}", directory.scheme()),
        });
    }

    if config.connection.reconnect_interval_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "connection.reconnect_interval_ms".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.connection.connect_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "connection.connect_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.logging.filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
