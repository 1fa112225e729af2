use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Upper bound on a single robot operation. Requests that exceed it are
    /// abandoned and answered with 503.
    pub request_timeout: Duration,
    /// TOML policy catalog. The built-in project catalog is used when unset.
    pub policy_catalog: Option<PathBuf>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("robokey.db")
    }

    /// Layers a parsed config file over the defaults.
    #[must_use]
    pub fn from_file(file: ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            host: file.host.unwrap_or(defaults.host),
            port: file.port.unwrap_or(defaults.port),
            data_dir: file.data_dir.unwrap_or(defaults.data_dir),
            request_timeout: file
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            policy_catalog: file.policy_catalog,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            policy_catalog: None,
        }
    }
}

/// On-disk form of [`ServerConfig`]. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub policy_catalog: Option<PathBuf>,
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        let file: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        if file.request_timeout_secs == Some(0) {
            return Err(Error::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(file)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let file = Self::parse(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(file)
    }
}
