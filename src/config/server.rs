use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 10000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Holds the database file and the certificate blob directory.
    pub data_dir: PathBuf,
    /// Directory the login and dashboard pages are served from.
    pub static_dir: PathBuf,
    /// Upper bound on any single database or blob operation.
    pub storage_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Loads a TOML config file. Keys left out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_timeout_secs == 0 {
            return Err(Error::Config(
                "storage_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("eventreg.db")
    }

    #[must_use]
    pub fn certificates_dir(&self) -> PathBuf {
        self.data_dir.join("certificates")
    }

    #[must_use]
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("./data"),
            static_dir: PathBuf::from("./frontend"),
            storage_timeout_secs: 10,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
