use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::MetaError;
use crate::exiftool::{DEFAULT_TIMEOUT, SystemExifTool};
use crate::store::ManagedStore;

pub const DEFAULT_CONFIG_FILE: &str = "metawiz.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage_root: Option<String>,
    #[serde(default)]
    pub exiftool: Option<String>,
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub storage_root: Option<Utf8PathBuf>,
    pub exiftool: Option<PathBuf>,
    pub tool_timeout: Duration,
}

impl ResolvedConfig {
    pub fn store(&self, root_override: Option<Utf8PathBuf>) -> Result<ManagedStore, MetaError> {
        match root_override.or_else(|| self.storage_root.clone()) {
            Some(root) => Ok(ManagedStore::new_with_root(root)),
            None => ManagedStore::new(),
        }
    }

    pub fn tool(&self) -> SystemExifTool {
        let tool = match &self.exiftool {
            Some(program) => SystemExifTool::with_program(program.clone()),
            None => SystemExifTool::new(),
        };
        tool.timeout(self.tool_timeout)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MetaError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MetaError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MetaError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MetaError> {
        let storage_root = config
            .storage_root
            .map(|root| root.trim().to_string())
            .filter(|root| !root.is_empty())
            .map(Utf8PathBuf::from);
        let exiftool = config
            .exiftool
            .map(|program| program.trim().to_string())
            .filter(|program| !program.is_empty())
            .map(PathBuf::from);
        let tool_timeout = match config.tool_timeout_secs {
            Some(0) => {
                return Err(MetaError::ConfigParse(
                    "tool_timeout_secs must be greater than zero".to_string(),
                ));
            }
            Some(seconds) => Duration::from_secs(seconds),
            None => DEFAULT_TIMEOUT,
        };

        Ok(ResolvedConfig {
            storage_root,
            exiftool,
            tool_timeout,
        })
    }
}
