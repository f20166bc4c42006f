//! Configuration system for tandem.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TANDEM_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/tandem/config.toml
//!   3. ~/.config/tandem/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TandemConfig {
    pub server: ServerConfig,
    pub matching: MatchingConfig,
    pub geolocation: GeolocationConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for HTTP and WebSocket traffic.
    pub bind_addr: String,
    pub port: u16,
    /// Allowed CORS origins. Empty = any origin.
    pub cors_origins: Vec<String>,
    /// Take the client address from the first X-Forwarded-For entry.
    /// Only enable behind a trusted reverse proxy.
    pub trust_forwarded_for: bool,
    /// Reported by /health.
    pub environment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// How long a reported peer stays excluded from matching.
    pub block_ttl_secs: u64,
    /// Interval of the block-list / geolocation-cache sweep.
    pub sweep_interval_secs: u64,
    /// Longest accepted hobby tag, in characters.
    pub max_hobby_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// false = every peer gets the "unknown" location.
    pub enabled: bool,
    /// Per-provider request timeout.
    pub timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Requests per IP to /api/* per window.
    pub api_requests_per_window: u32,
    pub api_window_secs: u64,
    /// Report submissions per IP per minute.
    pub reports_per_minute: u32,
    /// WebSocket connection attempts per IP per minute.
    pub connections_per_minute: u32,
    /// Frames buffered per peer before further outbound messages are dropped.
    pub outbound_queue_len: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
            trust_forwarded_for: false,
            environment: "development".to_string(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            block_ttl_secs: 600, // 10 minutes
            sweep_interval_secs: 30,
            max_hobby_len: 32,
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5000,
            cache_ttl_secs: 3600,
            user_agent: format!("tandem/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            api_requests_per_window: 100,
            api_window_secs: 900,
            reports_per_minute: 5,
            connections_per_minute: 10,
            outbound_queue_len: 256,
        }
    }
}

impl MatchingConfig {
    pub fn block_ttl(&self) -> Duration {
        Duration::from_secs(self.block_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl GeolocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("tandem")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TandemConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            TandemConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TANDEM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&TandemConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply `TANDEM_<SECTION>__<KEY>` overrides for every field.
    /// `lookup` is `std::env::var` outside tests. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // server
        if let Some(v) = lookup("TANDEM_SERVER__BIND_ADDR") {
            self.server.bind_addr = v;
        }
        // PORT is honoured for platform compatibility; the namespaced key wins.
        for key in ["PORT", "TANDEM_SERVER__PORT"] {
            if let Some(p) = parsed(&lookup, key) {
                self.server.port = p;
            }
        }
        if let Some(v) = lookup("TANDEM_SERVER__CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup("TANDEM_SERVER__TRUST_FORWARDED_FOR") {
            self.server.trust_forwarded_for = parse_bool(&v);
        }
        if let Some(v) = lookup("TANDEM_SERVER__ENVIRONMENT") {
            self.server.environment = v;
        }

        // matching
        if let Some(v) = parsed(&lookup, "TANDEM_MATCHING__BLOCK_TTL_SECS") {
            self.matching.block_ttl_secs = v;
        }
        if let Some(v) = parsed(&lookup, "TANDEM_MATCHING__SWEEP_INTERVAL_SECS") {
            self.matching.sweep_interval_secs = v;
        }
        if let Some(v) = parsed(&lookup, "TANDEM_MATCHING__MAX_HOBBY_LEN") {
            self.matching.max_hobby_len = v;
        }

        // geolocation
        if let Some(v) = lookup("TANDEM_GEOLOCATION__ENABLED") {
            self.geolocation.enabled = parse_bool(&v);
        }
        if let Some(v) = parsed(&lookup, "TANDEM_GEOLOCATION__TIMEOUT_MS") {
            self.geolocation.timeout_ms = v;
        }
        if let Some(v) = parsed(&lookup, "TANDEM_GEOLOCATION__CACHE_TTL_SECS") {
            self.geolocation.cache_ttl_secs = v;
        }
        if let Some(v) = lookup("TANDEM_GEOLOCATION__USER_AGENT") {
            self.geolocation.user_agent = v;
        }

        // limits
        if let Some(v) = parsed(&lookup, "TANDEM_LIMITS__API_REQUESTS_PER_WINDOW") {
            self.limits.api_requests_per_window = v;
        }
        if let Some(v) = parsed(&lookup, "TANDEM_LIMITS__API_WINDOW_SECS") {
            self.limits.api_window_secs = v;
        }
        if let Some(v) = parsed(&lookup, "TANDEM_LIMITS__REPORTS_PER_MINUTE") {
            self.limits.reports_per_minute = v;
        }
        if let Some(v) = parsed(&lookup, "TANDEM_LIMITS__CONNECTIONS_PER_MINUTE") {
            self.limits.connections_per_minute = v;
        }
        if let Some(v) = parsed(&lookup, "TANDEM_LIMITS__OUTBOUND_QUEUE_LEN") {
            self.limits.outbound_queue_len = v;
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn parse_bool(v: &str) -> bool {
    v == "true" || v == "1"
}
