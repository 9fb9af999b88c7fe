mod credentials;
mod file_config;

pub use credentials::Credentials;
pub use file_config::{FileConfig, RetryConfig};

use crate::domain::Domain;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "HugoSite/1.0";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub root: PathBuf,
    pub content_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub books_collection: Option<PathBuf>,
    pub rate_limit_ms: u64,
    pub request_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub user_agent: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        let retry = RetrySettings::default();
        Self {
            root: PathBuf::from("."),
            content_dir: None,
            static_dir: None,
            books_collection: None,
            rate_limit_ms: 1000,
            request_timeout_secs: 10,
            download_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total attempts per request, first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Site layout
    pub root: PathBuf,
    pub content_dir: PathBuf,
    pub static_dir: PathBuf,
    pub collection_files: Vec<(Domain, PathBuf)>,

    // Network behavior
    pub rate_limit: Duration,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    pub user_agent: String,
    pub retry: RetrySettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let root = file.root.map(PathBuf::from).unwrap_or_else(|| cli.root.clone());
        if !root.exists() {
            bail!("Site root does not exist: {:?}", root);
        }
        if !root.is_dir() {
            bail!("Site root is not a directory: {:?}", root);
        }

        let content_dir = file
            .content_dir
            .map(PathBuf::from)
            .or_else(|| cli.content_dir.clone())
            .unwrap_or_else(|| root.join("content"));
        let static_dir = file
            .static_dir
            .map(PathBuf::from)
            .or_else(|| cli.static_dir.clone())
            .unwrap_or_else(|| root.join("static"));
        let books_collection = file
            .books_collection
            .map(PathBuf::from)
            .or_else(|| cli.books_collection.clone())
            .unwrap_or_else(|| root.join("data").join("books").join("books.toml"));

        let rate_limit_ms = file.rate_limit_ms.unwrap_or(cli.rate_limit_ms);
        let request_timeout_secs = file.request_timeout_secs.unwrap_or(cli.request_timeout_secs);
        let download_timeout_secs = file.download_timeout_secs.unwrap_or(cli.download_timeout_secs);
        let user_agent = file
            .user_agent
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| cli.user_agent.clone());

        let retry_file = file.retry.unwrap_or_default();
        let retry = RetrySettings {
            max_attempts: retry_file.max_attempts.unwrap_or(cli.max_attempts),
            base_delay_ms: retry_file.base_delay_ms.unwrap_or(cli.base_delay_ms),
        };
        if retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }

        Ok(Self {
            root,
            content_dir,
            static_dir,
            collection_files: vec![(Domain::Book, books_collection)],
            rate_limit: Duration::from_millis(rate_limit_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
            download_timeout: Duration::from_secs(download_timeout_secs),
            user_agent,
            retry,
        })
    }

    pub fn env_file(&self) -> PathBuf {
        self.root.join(".env")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_at(root: &std::path::Path) -> CliConfig {
        CliConfig {
            root: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_hang_off_root() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&cli_at(dir.path()), None).unwrap();

        assert_eq!(config.content_dir, dir.path().join("content"));
        assert_eq!(config.static_dir, dir.path().join("static"));
        assert_eq!(
            config.collection_files,
            vec![(Domain::Book, dir.path().join("data/books/books.toml"))]
        );
        assert_eq!(config.rate_limit, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.download_timeout, Duration::from_secs(30));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.env_file(), dir.path().join(".env"));
    }

    #[test]
    fn test_file_overrides_cli() {
        let dir = TempDir::new().unwrap();
        let mut cli = cli_at(dir.path());
        cli.static_dir = Some(PathBuf::from("/cli/static"));
        cli.rate_limit_ms = 500;

        let file = FileConfig {
            static_dir: Some("/file/static".to_string()),
            retry: Some(RetryConfig {
                max_attempts: Some(5),
                base_delay_ms: None,
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.static_dir, PathBuf::from("/file/static"));
        assert_eq!(config.rate_limit, Duration::from_millis(500));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 2000);
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();

        assert!(AppConfig::resolve(&cli_at(&file), None).is_err());
        assert!(AppConfig::resolve(&cli_at(&dir.path().join("missing")), None).is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let dir = TempDir::new().unwrap();
        let mut cli = cli_at(dir.path());
        cli.max_attempts = 0;
        assert!(AppConfig::resolve(&cli, None).is_err());
    }
}
