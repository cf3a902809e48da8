//! Jira connection settings and the file-backed loader.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use jira_api::JiraConfig;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the platform config directory; pass --config")]
    NoConfigDir,
    #[error("configuration file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("configuration file {path} is not valid JSON: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration key '{0}' is missing")]
    MissingKey(&'static str),
    #[error("configuration key '{0}' is empty")]
    EmptyValue(&'static str),
    #[error("jira_server must start with http:// or https:// (got '{0}')")]
    InvalidServer(String),
}

/// Credentials and server address read from `config.json`.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub jira_server: String,
    pub jira_username: String,
    pub jira_api_token: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("jira_server", &self.jira_server)
            .field("jira_username", &self.jira_username)
            .field("jira_api_token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct RawConfig {
    jira_server: Option<String>,
    jira_username: Option<String>,
    jira_api_token: Option<String>,
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    let value = value.ok_or(ConfigError::MissingKey(key))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyValue(key));
    }
    Ok(trimmed.to_string())
}

impl AppConfig {
    /// Parses and validates the JSON document.
    pub fn from_json(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(content).map_err(|source| ConfigError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;

        let jira_server = required(raw.jira_server, "jira_server")?
            .trim_end_matches('/')
            .to_string();
        if !(jira_server.starts_with("http://") || jira_server.starts_with("https://")) {
            return Err(ConfigError::InvalidServer(jira_server));
        }

        Ok(Self {
            jira_server,
            jira_username: required(raw.jira_username, "jira_username")?,
            jira_api_token: required(raw.jira_api_token, "jira_api_token")?,
        })
    }

    pub fn to_jira_config(&self) -> JiraConfig {
        JiraConfig::new(&self.jira_server, &self.jira_username, &self.jira_api_token)
    }
}

/// Resolves the config file location and loads it.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Uses `path` when given, else `<platform config dir>/jira-focus/config.json`.
    pub fn new(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path,
            None => directories::ProjectDirs::from("", "", "jira-focus")
                .ok_or(ConfigError::NoConfigDir)?
                .config_dir()
                .join(CONFIG_FILE_NAME),
        };
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(self.path.clone())
            } else {
                ConfigError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        AppConfig::from_json(&self.path, &content)
    }
}
