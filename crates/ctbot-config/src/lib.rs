#![deny(unsafe_code)]

//! Configuration loading and validation for ctbot.
//!
//! Loads TOML configuration files and validates them against expected schemas.
//! Provides the [`AppConfig`] type as the central configuration structure.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound for every configured interval, in seconds (one week).
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon configuration.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Event stream configuration.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Chat command configuration.
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Lookup corpus locations.
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Outbound notification configuration.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Per-author command rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for the core daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Unix socket used for control-plane connections (`ctbot status`, `ctbot stop`).
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
        }
    }
}

fn default_socket_path() -> String {
    "/tmp/ctbot.sock".to_string()
}

/// Configuration for the release/module event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Whether the event stream consumer runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// WebSocket endpoint that pushes event frames.
    #[serde(default = "default_stream_url")]
    pub url: String,

    /// Interval between keep-alive pings, in seconds.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// A connection with no inbound traffic for this long is treated as dead.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// First reconnect delay in milliseconds; doubles on each failed attempt.
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    /// Upper bound for the reconnect delay, in seconds.
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,
}

impl StreamConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_stream_url(),
            ping_interval_secs: default_ping_interval_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_secs: default_reconnect_max_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_stream_url() -> String {
    "wss://chattriggers.com/api/events".to_string()
}

fn default_ping_interval_secs() -> u64 {
    60
}

fn default_idle_timeout_secs() -> u64 {
    150
}

fn default_reconnect_initial_ms() -> u64 {
    1000
}

fn default_reconnect_max_secs() -> u64 {
    60
}

/// Chat command configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Prefix that marks a chat line as a command (e.g. `!` in `!mcp`).
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Number of documentation results returned by `javadocs`.
    #[serde(default = "default_javadocs_limit")]
    pub javadocs_limit: usize,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            javadocs_limit: default_javadocs_limit(),
        }
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_javadocs_limit() -> usize {
    5
}

/// Where the read-only lookup corpora are loaded from at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// JSON array of documentation search terms.
    #[serde(default = "default_docs_path")]
    pub docs_path: String,

    /// JSON document with `fields`, `methods` and `classes` mapping tables.
    #[serde(default = "default_mappings_path")]
    pub mappings_path: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            docs_path: default_docs_path(),
            mappings_path: default_mappings_path(),
        }
    }
}

fn default_docs_path() -> String {
    "data/search_terms.json".to_string()
}

fn default_mappings_path() -> String {
    "data/mappings.json".to_string()
}

/// Outbound notification configuration.
///
/// ## TOML Example
///
/// ```toml
/// [notify]
/// sink = "webhook"
/// webhook_url_env = "CTBOT_WEBHOOK_URL"
/// color = 0x7b2fb5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Notification sink: "log" or "webhook".
    #[serde(default = "default_sink")]
    pub sink: String,

    /// Environment variable holding the webhook URL (it embeds a credential).
    #[serde(default = "default_webhook_url_env")]
    pub webhook_url_env: String,

    /// Accent color attached to rendered messages.
    #[serde(default = "default_color")]
    pub color: u32,

    /// Base URL that module names are appended to for notification links.
    #[serde(default = "default_module_url_base")]
    pub module_url_base: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
            webhook_url_env: default_webhook_url_env(),
            color: default_color(),
            module_url_base: default_module_url_base(),
        }
    }
}

fn default_sink() -> String {
    "log".to_string()
}

fn default_webhook_url_env() -> String {
    "CTBOT_WEBHOOK_URL".to_string()
}

fn default_color() -> u32 {
    0x7b2fb5
}

fn default_module_url_base() -> String {
    "https://www.chattriggers.com/modules/v/".to_string()
}

/// Per-author token bucket for inbound commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Burst size per author.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// One token is refilled every `refill_secs`.
    #[serde(default = "default_refill_secs")]
    pub refill_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            refill_secs: default_refill_secs(),
        }
    }
}

fn default_max_tokens() -> u32 {
    5
}

fn default_refill_secs() -> u64 {
    3
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.socket_path.is_empty() {
            return Err(ConfigError::Validation(
                "daemon.socket_path must not be empty".to_string(),
            ));
        }

        // Stream
        if self.stream.enabled
            && !(self.stream.url.starts_with("ws://") || self.stream.url.starts_with("wss://"))
        {
            return Err(ConfigError::Validation(format!(
                "stream.url must use the ws:// or wss:// scheme, got {:?}",
                self.stream.url
            )));
        }
        if self.stream.ping_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "stream.ping_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.stream.idle_timeout_secs <= self.stream.ping_interval_secs {
            return Err(ConfigError::Validation(format!(
                "stream.idle_timeout_secs ({}) must exceed stream.ping_interval_secs ({})",
                self.stream.idle_timeout_secs, self.stream.ping_interval_secs
            )));
        }
        if self.stream.reconnect_initial_ms == 0 {
            return Err(ConfigError::Validation(
                "stream.reconnect_initial_ms must be non-zero".to_string(),
            ));
        }
        if self.stream.reconnect_initial() > self.stream.reconnect_max() {
            return Err(ConfigError::Validation(
                "stream.reconnect_initial_ms must not exceed stream.reconnect_max_secs".to_string(),
            ));
        }
        for (name, secs) in [
            ("stream.ping_interval_secs", self.stream.ping_interval_secs),
            ("stream.idle_timeout_secs", self.stream.idle_timeout_secs),
            ("stream.reconnect_max_secs", self.stream.reconnect_max_secs),
            ("rate_limit.refill_secs", self.rate_limit.refill_secs),
        ] {
            if secs > MAX_INTERVAL_SECS {
                return Err(ConfigError::Validation(format!(
                    "{name} must be at most {MAX_INTERVAL_SECS}, got {secs}"
                )));
            }
        }

        // Commands
        if self.commands.prefix.is_empty() {
            return Err(ConfigError::Validation(
                "commands.prefix must not be empty".to_string(),
            ));
        }
        if self.commands.prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "commands.prefix must not contain whitespace, got {:?}",
                self.commands.prefix
            )));
        }
        if self.commands.javadocs_limit == 0 {
            return Err(ConfigError::Validation(
                "commands.javadocs_limit must be at least 1".to_string(),
            ));
        }

        // Notify
        let valid_sinks = ["log", "webhook"];
        if !valid_sinks.contains(&self.notify.sink.as_str()) {
            return Err(ConfigError::Validation(format!(
                "notify.sink must be one of {:?}, got {:?}",
                valid_sinks, self.notify.sink
            )));
        }
        if self.notify.sink == "webhook" && self.notify.webhook_url_env.is_empty() {
            return Err(ConfigError::Validation(
                "notify.webhook_url_env is required when notify.sink is \"webhook\"".to_string(),
            ));
        }
        if self.notify.color > 0xFF_FF_FF {
            return Err(ConfigError::Validation(format!(
                "notify.color must be a 24-bit RGB value, got {:#x}",
                self.notify.color
            )));
        }

        if self.rate_limit.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.max_tokens must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
