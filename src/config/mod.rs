use crate::error::Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sentinel for an exclude-list that excludes nothing
pub const EXCLUDE_NOTHING: &str = "None";
/// Sentinel for an include-list that includes everything
pub const INCLUDE_EVERYTHING: &str = "All";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub frigate: FrigateConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Detection API (Frigate) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrigateConfig {
    /// Base URL used to reach the API
    #[serde(default = "default_frigate_url")]
    pub url: String,
    /// Base URL used in deep links sent to the chat
    #[serde(default = "default_frigate_url")]
    pub external_url: String,
    /// Maximum number of events per fetch
    #[serde(default = "default_event_limit")]
    pub event_limit: u32,
    /// HTTP request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_frigate_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_event_limit() -> u32 {
    20
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for FrigateConfig {
    fn default() -> Self {
        Self {
            url: default_frigate_url(),
            external_url: default_frigate_url(),
            event_limit: default_event_limit(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// The only chat notifications go to and commands are accepted from
    #[serde(default)]
    pub chat_id: i64,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Answer chat commands
    #[serde(default = "default_true")]
    pub commands_enabled: bool,
    /// Long-poll timeout for getUpdates (seconds)
    #[serde(default = "default_updates_timeout")]
    pub updates_timeout_secs: u64,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_updates_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: 0,
            api_base: default_telegram_api_base(),
            commands_enabled: true,
            updates_timeout_secs: default_updates_timeout(),
        }
    }
}

/// Which state store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// State store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_addr")]
    pub redis_addr: String,
    #[serde(default)]
    pub redis_password: String,
    #[serde(default)]
    pub redis_db: u32,
    /// Lifetime of InProgress / Finished markers (seconds)
    #[serde(default = "default_event_ttl")]
    pub event_ttl_secs: u64,
    /// Lifetime of InWork claim markers (seconds)
    #[serde(default = "default_claim_ttl")]
    pub claim_ttl_secs: u64,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Redis
}

fn default_redis_addr() -> String {
    "localhost:6379".to_string()
}

fn default_event_ttl() -> u64 {
    1_209_600 // 14 days
}

fn default_claim_ttl() -> u64 {
    60
}

impl StoreConfig {
    /// Connection URL for the Redis backend
    pub fn redis_url(&self) -> String {
        if self.redis_password.is_empty() {
            format!("redis://{}/{}", self.redis_addr, self.redis_db)
        } else {
            format!(
                "redis://:{}@{}/{}",
                self.redis_password, self.redis_addr, self.redis_db
            )
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            redis_addr: default_redis_addr(),
            redis_password: String::new(),
            redis_db: 0,
            event_ttl_secs: default_event_ttl(),
            claim_ttl_secs: default_claim_ttl(),
        }
    }
}

/// Camera / label / zone include and exclude lists
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default = "default_exclude")]
    pub exclude_cameras: Vec<String>,
    #[serde(default = "default_include")]
    pub include_cameras: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude_labels: Vec<String>,
    #[serde(default = "default_include")]
    pub include_labels: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude_zones: Vec<String>,
    #[serde(default = "default_include")]
    pub include_zones: Vec<String>,
}

fn default_exclude() -> Vec<String> {
    vec![EXCLUDE_NOTHING.to_string()]
}

fn default_include() -> Vec<String> {
    vec![INCLUDE_EVERYTHING.to_string()]
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_cameras: default_exclude(),
            include_cameras: default_include(),
            exclude_labels: default_exclude(),
            include_labels: default_include(),
            exclude_zones: default_exclude(),
            include_zones: default_include(),
        }
    }
}

/// Primary poll loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Seconds between polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Only fetch events that started within this many seconds
    #[serde(default = "default_lookback")]
    pub lookback_secs: u64,
    /// Wait before downloading a clip so the recorder can finish writing it
    #[serde(default = "default_clip_settle")]
    pub clip_settle_secs: u64,
    /// Consecutive undecodable batches tolerated before giving up
    #[serde(default = "default_max_decode_failures")]
    pub max_decode_failures: u32,
    /// Directory for temporary media files
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_lookback() -> u64 {
    3600
}

fn default_clip_settle() -> u64 {
    5
}

fn default_max_decode_failures() -> u32 {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            lookback_secs: default_lookback(),
            clip_settle_secs: default_clip_settle(),
            max_decode_failures: default_max_decode_failures(),
            temp_dir: None,
        }
    }
}

/// Watchdog loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchdogConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_watchdog_interval")]
    pub interval_secs: u64,
    /// Fetch events that started before now minus this many seconds
    #[serde(default = "default_watchdog_lookback")]
    pub lookback_secs: u64,
}

fn default_watchdog_interval() -> u64 {
    3
}

fn default_watchdog_lookback() -> u64 {
    30
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_watchdog_interval(),
            lookback_secs: default_watchdog_lookback(),
        }
    }
}

/// Control-plane API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// API server address
    #[serde(default = "default_api_address")]
    pub address: String,
    /// API server port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_api_address(),
            port: default_api_port(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Check the settings the service cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(Error::Config("telegram bot token is not set".to_string()).into());
        }
        if self.telegram.chat_id == 0 {
            return Err(Error::Config("telegram chat id is not set".to_string()).into());
        }
        if self.pipeline.poll_interval_secs == 0 {
            return Err(Error::Config("poll interval must be positive".to_string()).into());
        }
        if self.watchdog.enabled && self.watchdog.interval_secs == 0 {
            return Err(Error::Config("watchdog interval must be positive".to_string()).into());
        }
        if self.store.claim_ttl_secs == 0 || self.store.event_ttl_secs == 0 {
            return Err(Error::Config("store TTLs must be positive".to_string()).into());
        }
        url::Url::parse(&self.frigate.url)
            .map_err(|e| Error::Config(format!("invalid frigate url {}: {}", self.frigate.url, e)))?;
        Ok(())
    }
}

/// Load configuration from a file or use default
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .context(format!("Failed to read config file: {:?}", path))?;

            let config = if path.extension().map_or(false, |ext| ext == "json") {
                serde_json::from_str(&config_str).context("Failed to parse JSON config")?
            } else if path.extension().map_or(false, |ext| ext == "toml") {
                toml::from_str(&config_str).context("Failed to parse TOML config")?
            } else {
                return Err(anyhow::anyhow!("Unsupported config file format"));
            };

            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Overlay settings from environment-style variables.
///
/// `lookup` returns the value of a variable if it is set. Values that fail to
/// parse are ignored and the current setting is kept.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str, target: &mut String| {
        if let Some(value) = lookup(name) {
            *target = value;
        }
    };
    let list = |name: &str, target: &mut Vec<String>| {
        if let Some(value) = lookup(name) {
            *target = split_list(&value);
        }
    };

    string("FRIGATE_URL", &mut config.frigate.url);
    string("FRIGATE_EXTERNAL_URL", &mut config.frigate.external_url);
    parse_into(&lookup, "FRIGATE_EVENT_LIMIT", &mut config.frigate.event_limit);

    string("TELEGRAM_BOT_TOKEN", &mut config.telegram.bot_token);
    parse_into(&lookup, "TELEGRAM_CHAT_ID", &mut config.telegram.chat_id);

    string("REDIS_ADDR", &mut config.store.redis_addr);
    string("REDIS_PASSWORD", &mut config.store.redis_password);
    parse_into(&lookup, "REDIS_DB", &mut config.store.redis_db);
    parse_into(&lookup, "REDIS_TTL", &mut config.store.event_ttl_secs);

    parse_into(&lookup, "SLEEP_TIME", &mut config.pipeline.poll_interval_secs);
    parse_into(&lookup, "TIME_WAIT_SAVE", &mut config.pipeline.clip_settle_secs);

    parse_into(&lookup, "WATCH_DOG", &mut config.watchdog.enabled);
    parse_into(&lookup, "WATCH_DOG_SLEEP_TIME", &mut config.watchdog.interval_secs);
    parse_into(&lookup, "EVENT_BEFORE_SECONDS", &mut config.watchdog.lookback_secs);

    list("FRIGATE_EXCLUDE_CAMERA", &mut config.filters.exclude_cameras);
    list("FRIGATE_INCLUDE_CAMERA", &mut config.filters.include_cameras);
    list("FRIGATE_EXCLUDE_LABEL", &mut config.filters.exclude_labels);
    list("FRIGATE_INCLUDE_LABEL", &mut config.filters.include_labels);
    list("FRIGATE_EXCLUDE_ZONE", &mut config.filters.exclude_zones);
    list("FRIGATE_INCLUDE_ZONE", &mut config.filters.include_zones);

    parse_into(&lookup, "REST_API_ENABLE", &mut config.api.enabled);
    if let Some(listen) = lookup("REST_API_LISTEN_ADDR") {
        if let Some((address, port)) = listen.rsplit_once(':') {
            if let Ok(port) = port.parse() {
                if !address.is_empty() {
                    config.api.address = address.to_string();
                }
                config.api.port = port;
            }
        }
    }

    let mut debug = false;
    parse_into(&lookup, "DEBUG", &mut debug);
    if debug {
        config.api.log_level = "debug".to_string();
    }
}

fn parse_into<F, T>(lookup: &F, name: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(parsed) = lookup(name).and_then(|v| v.trim().parse().ok()) {
        *target = parsed;
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.frigate.event_limit, 20);
        assert_eq!(config.pipeline.poll_interval_secs, 5);
        assert_eq!(config.store.claim_ttl_secs, 60);
        assert_eq!(config.filters.exclude_cameras, vec!["None"]);
        assert_eq!(config.filters.include_zones, vec!["All"]);
        assert!(!config.watchdog.enabled);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"
            chat_id = -100

            [filters]
            include_cameras = ["front", "back"]
            "#,
        )
        .unwrap();

        assert_eq!(config.telegram.chat_id, -100);
        assert_eq!(config.filters.include_cameras, vec!["front", "back"]);
        assert_eq!(config.filters.exclude_labels, vec!["None"]);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("FRIGATE_URL", "http://nvr:5000"),
                ("TELEGRAM_CHAT_ID", "42"),
                ("SLEEP_TIME", "not-a-number"),
                ("FRIGATE_EXCLUDE_ZONE", "driveway, street"),
                ("WATCH_DOG", "true"),
                ("REST_API_LISTEN_ADDR", ":9090"),
                ("DEBUG", "true"),
            ]),
        );

        assert_eq!(config.frigate.url, "http://nvr:5000");
        assert_eq!(config.telegram.chat_id, 42);
        assert_eq!(config.pipeline.poll_interval_secs, 5);
        assert_eq!(config.filters.exclude_zones, vec!["driveway", "street"]);
        assert!(config.watchdog.enabled);
        assert_eq!(config.api.address, "0.0.0.0");
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.api.log_level, "debug");
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bot token"));
    }

    #[test]
    fn test_redis_url() {
        let mut store = StoreConfig::default();
        assert_eq!(store.redis_url(), "redis://localhost:6379/0");
        store.redis_password = "secret".to_string();
        store.redis_db = 2;
        assert_eq!(store.redis_url(), "redis://:secret@localhost:6379/2");
    }
}
