use anyhow::{Context, Result};
use serde::Deserialize;

/// How detected updates travel from the scheduler to the notifier.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Hand updates to the notifier in-process
    #[default]
    Direct,
    /// Publish updates to the internal queue, consumed separately
    Queue,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "data/logs".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Interval between sweeps in immediate mode (seconds)
    #[serde(default = "default_immediate_interval_sec")]
    pub immediate_interval_sec: u64,
    /// Local hour (0-23) at which the daily digest sweep fires
    #[serde(default = "default_digest_hour")]
    pub digest_hour: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            immediate_interval_sec: default_immediate_interval_sec(),
            digest_hour: default_digest_hour(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    #[serde(default)]
    pub mode: TransportMode,
    /// Bounded capacity of the internal update queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// TTL of cached link lists (seconds)
    #[serde(default = "default_links_ttl_sec")]
    pub links_ttl_sec: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            links_ttl_sec: default_links_ttl_sec(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Timeout for outbound GitHub/StackOverflow requests (seconds)
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
    /// Abandoned /track dialogues are dropped after this long (seconds)
    #[serde(default = "default_dialogue_ttl_sec")]
    pub dialogue_ttl_sec: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            request_timeout_sec: default_request_timeout_sec(),
            dialogue_ttl_sec: default_dialogue_ttl_sec(),
        }
    }
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_immediate_interval_sec() -> u64 {
    60
}

fn default_digest_hour() -> u32 {
    20
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_links_ttl_sec() -> u64 {
    60
}

fn default_request_timeout_sec() -> u64 {
    10
}

fn default_dialogue_ttl_sec() -> u64 {
    15 * 60
}

impl Config {
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(config::Environment::with_prefix("LT").separator("__"));

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.logging.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "info" => tracing::Level::INFO,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}
