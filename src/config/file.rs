//! TOML configuration file loading
//!
//! Supports `~/.config/product-preview/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct PreviewConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Outbound page fetch configuration
    #[serde(default)]
    pub fetch: FetchFileConfig,

    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheFileConfig,
}

/// Server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Origins allowed to call the preview endpoint
    pub cors_origins: Option<Vec<String>>,
}

/// Fetcher configuration
#[derive(Debug, Default, Deserialize)]
pub struct FetchFileConfig {
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Maximum redirects to follow
    pub max_redirects: Option<usize>,

    /// User-Agent header sent with every request
    pub user_agent: Option<String>,

    /// Refuse hosts that resolve to private or loopback addresses
    pub block_private_hosts: Option<bool>,
}

/// Cache configuration
#[derive(Debug, Default, Deserialize)]
pub struct CacheFileConfig {
    /// Entry lifetime in seconds
    pub ttl_secs: Option<u64>,

    /// Maximum number of cached URLs
    pub max_entries: Option<usize>,
}

/// Load the TOML config file from `PREVIEW_CONFIG` or the standard path
///
/// Returns `PreviewConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> PreviewConfigFile {
    let path = std::env::var("PREVIEW_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(config_file_path);

    match path {
        Some(path) => load_config_file_from(&path),
        None => PreviewConfigFile::default(),
    }
}

/// Load a TOML config file from an explicit path
pub fn load_config_file_from(path: &Path) -> PreviewConfigFile {
    if !path.exists() {
        return PreviewConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                PreviewConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            PreviewConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/product-preview/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("product-preview")
            .join("config.toml")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let file: PreviewConfigFile = toml::from_str(
            r#"
            [server]
            port = 6000

            [cache]
            ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(file.server.port, Some(6000));
        assert_eq!(file.cache.ttl_secs, Some(60));
        assert!(file.cache.max_entries.is_none());
        assert!(file.fetch.timeout_secs.is_none());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[fetch]\ntimeout_secs = 3\nblock_private_hosts = false\n\n[server]\ncors_origins = [\"https://a.test\"]\n",
        )
        .unwrap();

        let file = load_config_file_from(&path);
        assert_eq!(file.fetch.timeout_secs, Some(3));
        assert_eq!(file.fetch.block_private_hosts, Some(false));
        assert_eq!(
            file.server.cors_origins,
            Some(vec!["https://a.test".to_string()])
        );
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = load_config_file_from(&dir.path().join("nope.toml"));
        assert!(file.server.port.is_none());
    }

    #[test]
    fn test_invalid_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let file = load_config_file_from(&path);
        assert!(file.server.port.is_none());
    }
}
