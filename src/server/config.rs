use anyhow::{Result, bail};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Settings for the HTTP API.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// CSV data directory to seed the store from. `None` starts empty.
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.addr.port() == 0 {
            bail!("port must be non-zero");
        }
        if let Some(dir) = &self.data_dir {
            if !dir.is_dir() {
                bail!("data directory {} does not exist", dir.display());
            }
        }
        Ok(())
    }
}
