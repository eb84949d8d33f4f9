//! Configuration management for the preview service

pub mod file;

use std::time::Duration;

use crate::{Error, Result};

use file::PreviewConfigFile;

/// Default API port
pub const DEFAULT_PORT: u16 = 5001;

/// Default browser-like User-Agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Front-end origins allowed by default
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:8080",
    "http://localhost:5173",
    "https://swainrecommend.netlify.app",
];

/// Preview service configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Outbound fetch configuration
    pub fetch: FetchConfig,

    /// Response cache configuration
    pub cache: CacheConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Origins allowed to call the API cross-origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Outbound page fetch configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Maximum number of redirects to follow
    pub max_redirects: usize,

    /// User-Agent header value
    pub user_agent: String,

    /// Refuse hosts that resolve to private/loopback addresses
    pub block_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            max_redirects: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            block_private_hosts: true,
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for a cached preview
    pub ttl: Duration,

    /// Capacity bound (least recently used entries are evicted past this)
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(6 * 60 * 60),
            max_entries: 1024,
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment
    ///
    /// # Errors
    ///
    /// Returns error if an override is malformed or out of range
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Merge defaults, a parsed config file and an environment lookup
    ///
    /// Environment values win over the file.
    ///
    /// # Errors
    ///
    /// Returns error if an override is malformed or out of range
    pub fn from_sources<F>(fc: PreviewConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match env("PORT") {
            Some(v) => parse_var("PORT", &v)?,
            None => fc.server.port.unwrap_or(defaults.server.port),
        };

        let cors_origins = env("PREVIEW_CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .or(fc.server.cors_origins)
            .unwrap_or(defaults.server.cors_origins);

        let timeout_secs = match env("PREVIEW_FETCH_TIMEOUT_SECS") {
            Some(v) => parse_var("PREVIEW_FETCH_TIMEOUT_SECS", &v)?,
            None => fc
                .fetch
                .timeout_secs
                .unwrap_or(defaults.fetch.timeout.as_secs()),
        };

        let user_agent = env("PREVIEW_USER_AGENT")
            .or(fc.fetch.user_agent)
            .unwrap_or(defaults.fetch.user_agent);

        let block_private_hosts = match env("PREVIEW_BLOCK_PRIVATE_HOSTS") {
            Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"),
            None => fc
                .fetch
                .block_private_hosts
                .unwrap_or(defaults.fetch.block_private_hosts),
        };

        let ttl_secs = match env("PREVIEW_CACHE_TTL_SECS") {
            Some(v) => parse_var("PREVIEW_CACHE_TTL_SECS", &v)?,
            None => fc.cache.ttl_secs.unwrap_or(defaults.cache.ttl.as_secs()),
        };

        let max_entries = match env("PREVIEW_CACHE_MAX_ENTRIES") {
            Some(v) => parse_var("PREVIEW_CACHE_MAX_ENTRIES", &v)?,
            None => fc.cache.max_entries.unwrap_or(defaults.cache.max_entries),
        };

        if timeout_secs == 0 {
            return Err(Error::Config("fetch timeout must be at least 1 second".into()));
        }
        if max_entries == 0 {
            return Err(Error::Config("cache max_entries must be non-zero".into()));
        }

        Ok(Self {
            server: ServerConfig { port, cors_origins },
            fetch: FetchConfig {
                timeout: Duration::from_secs(timeout_secs),
                max_redirects: fc.fetch.max_redirects.unwrap_or(defaults.fetch.max_redirects),
                user_agent,
                block_private_hosts,
            },
            cache: CacheConfig {
                ttl: Duration::from_secs(ttl_secs),
                max_entries,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {key}: {value:?}")))
}
