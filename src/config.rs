//! Configuration management for RAX Media Server
//!
//! Separates startup configuration (requires restart) from runtime configuration
//! (upload limits, read on every upload).

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::auth::PermissionLevel;
use crate::transfer::MimePolicy;

/// Environment variable naming the config file (without extension)
pub const CONFIG_PATH_ENV: &str = "MEDIA_BROWSER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config";
const ENV_PREFIX: &str = "MEDIA_BROWSER";

/// Complete server configuration with startup/runtime separation
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub startup: StartupConfig,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,
}

/// Configuration that requires server restart to take effect
#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    // ═══ NETWORK (Environment Override Supported) ═══
    /// IP address to bind the HTTP listener
    pub bind_address: String,

    /// HTTP port
    pub port: u16,

    /// Directory every browse/media operation is confined to
    pub media_root: String,

    /// Optional directory of UI assets served for non-API paths
    #[serde(default)]
    pub static_dir: Option<String>,

    // ═══ INTERNAL BEHAVIOR ═══
    /// Read buffer size used when streaming media bodies
    pub stream_buffer_size: usize,

    /// Lifetime of a login session
    pub session_ttl_secs: u64,

    /// Reject paths whose symlinks point outside the media root
    pub confine_symlinks: bool,

    /// How content types are chosen for media responses
    pub mime_policy: MimePolicy,

    /// Whether the rename endpoint is exposed
    pub enable_rename: bool,

    /// Failed logins allowed per username within `login_window_secs`
    pub login_max_attempts: usize,
    pub login_window_secs: u64,

    /// Accounts allowed to log in
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

/// One `[[users]]` entry of the config file
#[derive(Debug, Deserialize, Clone)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
    pub level: PermissionLevel,
}

/// Configuration read per request; can be swapped while the server runs
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Maximum size of a single uploaded file in MB
    /// Environment: MEDIA_BROWSER__MAX_FILE_SIZE_MB
    pub max_file_size_mb: u64,

    /// Maximum number of files accepted by one upload request
    /// Environment: MEDIA_BROWSER__MAX_UPLOAD_FILES
    pub max_upload_files: usize,
}

/// Thread-safe runtime configuration wrapper
pub type SharedRuntimeConfig = Arc<RwLock<RuntimeConfig>>;

impl ServerConfig {
    /// Load configuration from the file named by `MEDIA_BROWSER_CONFIG`
    /// (default `config.toml`) with environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path. A missing file falls back to defaults.
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let settings = Self::with_defaults(Config::builder())?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        builder
            .set_default("bind_address", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("media_root", "./media_root")?
            .set_default("stream_buffer_size", 64 * 1024)?
            .set_default("session_ttl_secs", 24 * 60 * 60)?
            .set_default("confine_symlinks", true)?
            .set_default("mime_policy", "per_extension")?
            .set_default("enable_rename", true)?
            .set_default("login_max_attempts", 5)?
            .set_default("login_window_secs", 300)?
            .set_default("max_file_size_mb", 100)?
            .set_default("max_upload_files", 5)
    }

    /// Split into startup (immutable) and runtime (mutable) parts
    pub fn split(self) -> (StartupConfig, SharedRuntimeConfig) {
        let runtime = Arc::new(RwLock::new(self.runtime));
        (self.startup, runtime)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.startup.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.startup.media_root.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "media_root cannot be empty".into(),
            ));
        }

        if self.startup.stream_buffer_size == 0 {
            return Err(config::ConfigError::Message(
                "stream_buffer_size must be greater than 0".into(),
            ));
        }

        if self.startup.users.is_empty() {
            return Err(config::ConfigError::Message(
                "at least one [[users]] entry is required".into(),
            ));
        }

        if self.startup.login_max_attempts == 0 {
            return Err(config::ConfigError::Message(
                "login_max_attempts must be greater than 0".into(),
            ));
        }

        if self.runtime.max_file_size_mb == 0 {
            return Err(config::ConfigError::Message(
                "max_file_size_mb must be greater than 0".into(),
            ));
        }

        if self.runtime.max_upload_files == 0 {
            return Err(config::ConfigError::Message(
                "max_upload_files must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl StartupConfig {
    /// Bind address and port as a socket address string
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn media_root_path(&self) -> PathBuf {
        PathBuf::from(&self.media_root)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn login_window(&self) -> Duration {
        Duration::from_secs(self.login_window_secs)
    }
}

impl RuntimeConfig {
    /// Get maximum file size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}
