use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::device::CameraSubmission;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub cameras: Vec<CameraSubmission>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub listen_address: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl AppConfig {
    /// Loads the YAML file at `path`, overridden by `REOLINK_BRIDGE__*`
    /// environment variables (e.g. `REOLINK_BRIDGE__SERVER__LISTEN_ADDRESS`).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(Environment::with_prefix("REOLINK_BRIDGE").separator("__"))
            .build()
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        config
            .try_deserialize()
            .context("Failed to parse YAML configuration")
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(contents, FileFormat::Yaml))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse YAML configuration")
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
