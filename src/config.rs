use std::fs;
use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use crate::core::{FileError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "filedock.toml";
pub const ENDPOINT_ENV: &str = "FILEDOCK_ENDPOINT";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the file manager server.
    pub endpoint: String,
    /// Directory shown first.
    pub start_path: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            start_path: "/".to_string(),
            timeout_secs: 300, // 5 分钟
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|err| FileError::Config(err.to_string()))
    }

    /// Read `path`. A missing default file yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .map_err(|err| FileError::Config(format!("{}: {}", path.display(), err)))?;
                Self::from_toml(&content)?
            }
            None => match fs::read_to_string(DEFAULT_CONFIG_FILE) {
                Ok(content) => Self::from_toml(&content)?,
                Err(_) => Config::default(),
            },
        };

        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            config.endpoint = endpoint;
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
