use crate::subnet::TrustedSubnet;
use burrow_shortener::DeletionConfig;
use burrow_storage::StorageBackend;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const TRUSTED_SUBNET_ENV: &str = "TRUSTED_SUBNET";
pub const COOKIE_SECRET_ENV: &str = "COOKIE_SECRET";
pub const DELETE_FLUSH_INTERVAL_ENV: &str = "DELETE_FLUSH_INTERVAL_SECS";
pub const DELETE_QUEUE_CAPACITY_ENV: &str = "DELETE_QUEUE_CAPACITY";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const CONFIG_ENV: &str = "CONFIG";

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid trusted subnet {0:?}")]
    InvalidSubnet(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Command line flags. Every flag falls back to an environment variable,
/// then to the JSON config file, then to a built-in default.
#[derive(Debug, Parser)]
#[command(name = "burrow", about = "URL shortener")]
pub struct Cli {
    /// Address the HTTP server listens on.
    #[arg(short = 'a', long, env = SERVER_ADDRESS_ENV)]
    pub server_address: Option<String>,

    /// Prefix of every short URL handed out.
    #[arg(short = 'b', long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    /// JSON-lines file used when no database is configured.
    #[arg(short = 'f', long, env = FILE_STORAGE_PATH_ENV)]
    pub file_storage_path: Option<PathBuf>,

    /// PostgreSQL connection string.
    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    /// CIDR allowed to read internal statistics.
    #[arg(short = 't', long, env = TRUSTED_SUBNET_ENV)]
    pub trusted_subnet: Option<String>,

    /// Secret the identity cookie key is derived from.
    #[arg(long, env = COOKIE_SECRET_ENV, hide_env_values = true)]
    pub cookie_secret: Option<String>,

    #[arg(long, env = DELETE_FLUSH_INTERVAL_ENV)]
    pub delete_flush_interval_secs: Option<u64>,

    #[arg(long, env = DELETE_QUEUE_CAPACITY_ENV)]
    pub delete_queue_capacity: Option<usize>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum)]
    pub log_format: Option<LogFormat>,

    /// JSON config file.
    #[arg(short = 'c', long = "config", env = CONFIG_ENV)]
    pub config: Option<PathBuf>,
}

/// Contents of the optional JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server_address: Option<String>,
    pub base_url: Option<String>,
    pub file_storage_path: Option<PathBuf>,
    pub database_dsn: Option<String>,
    pub trusted_subnet: Option<String>,
    pub cookie_secret: Option<String>,
    pub delete_flush_interval_secs: Option<u64>,
    pub delete_queue_capacity: Option<usize>,
    pub log_format: Option<LogFormat>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_address: String,
    pub base_url: String,
    pub storage: StorageBackend,
    pub trusted_subnet: Option<TrustedSubnet>,
    /// `None` means a per-process secret is generated at startup.
    pub cookie_secret: Option<String>,
    pub deletion: DeletionConfig,
    pub log_format: LogFormat,
}

/// Picks the first value that is present and not blank.
fn pick<T>(flag: Option<T>, file: Option<T>, is_blank: impl Fn(&T) -> bool) -> Option<T> {
    flag.filter(|v| !is_blank(v))
        .or_else(|| file.filter(|v| !is_blank(v)))
}

fn blank(value: &String) -> bool {
    value.trim().is_empty()
}

impl Cli {
    /// Merges flags, environment and the config file into [`Settings`].
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let file = match &self.config {
            Some(path) if !path.as_os_str().is_empty() => FileConfig::load(path)?,
            _ => FileConfig::default(),
        };

        let server_address = pick(self.server_address, file.server_address, blank)
            .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string());
        let base_url = pick(self.base_url, file.base_url, blank)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let dsn = pick(self.database_dsn, file.database_dsn, blank);
        let path = pick(self.file_storage_path, file.file_storage_path, |p| {
            p.as_os_str().is_empty()
        });
        let storage = StorageBackend::select(dsn.as_deref(), path.as_deref());

        let trusted_subnet = pick(self.trusted_subnet, file.trusted_subnet, blank)
            .map(|cidr| {
                cidr.parse::<TrustedSubnet>()
                    .map_err(|_| ConfigError::InvalidSubnet(cidr))
            })
            .transpose()?;

        let flush_secs = self
            .delete_flush_interval_secs
            .or(file.delete_flush_interval_secs)
            .unwrap_or(DEFAULT_FLUSH_INTERVAL_SECS);
        let capacity = self
            .delete_queue_capacity
            .or(file.delete_queue_capacity)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);

        Ok(Settings {
            server_address,
            base_url: base_url.trim_end_matches('/').to_string(),
            storage,
            trusted_subnet,
            cookie_secret: pick(self.cookie_secret, file.cookie_secret, blank),
            deletion: DeletionConfig::builder()
                .flush_interval(Duration::from_secs(flush_secs.max(1)))
                .capacity(capacity.max(1))
                .build(),
            log_format: self.log_format.or(file.log_format).unwrap_or_default(),
        })
    }
}
