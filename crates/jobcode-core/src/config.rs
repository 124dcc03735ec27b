use crate::error::{JobcodeError, Result};
use crate::gateway::{Credentials, HarvestClient, TeamworkClient};
use crate::sequence::SequenceDb;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "jobcode.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

/// Where a remote service lives and how to authenticate against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(flatten)]
    pub credentials: Credentials,
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("jobcode.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub teamwork: ServiceConfig,
    #[serde(default)]
    pub harvest: ServiceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            teamwork: ServiceConfig::default(),
            harvest: ServiceConfig::default(),
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl Config {
    /// Read the YAML file at `path`. A missing file yields the defaults so
    /// a deployment can be configured from the environment alone.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// [`Config::load`] followed by the process environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        Ok(Self::load(path)?.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Apply `TEAMWORK_*`, `HARVEST_*` and `JOBCODE_DATABASE` values from
    /// `lookup`. Blank values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TEAMWORK_BASE_URL") {
            self.teamwork.base_url = v;
        }
        if let Some(v) = get("TEAMWORK_USER") {
            self.teamwork.credentials.username = v;
        }
        if let Some(v) = get("TEAMWORK_PASS") {
            self.teamwork.credentials.password = v;
        }
        if let Some(v) = get("HARVEST_BASE_URL") {
            self.harvest.base_url = v;
        }
        if let Some(v) = get("HARVEST_USER") {
            self.harvest.credentials.username = v;
        }
        if let Some(v) = get("HARVEST_PASS") {
            self.harvest.credentials.password = v;
        }
        if let Some(v) = get("JOBCODE_DATABASE") {
            self.database.path = PathBuf::from(v);
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sequence_db(&self) -> SequenceDb {
        SequenceDb::new(&self.database.path)
    }

    pub fn teamwork_client(&self) -> Result<TeamworkClient> {
        if self.teamwork.base_url.trim().is_empty() {
            return Err(JobcodeError::Config("teamwork.base_url is not set".into()));
        }
        TeamworkClient::new(
            &self.teamwork.base_url,
            self.teamwork.credentials.clone(),
            self.request_timeout(),
        )
    }

    pub fn harvest_client(&self) -> Result<HarvestClient> {
        if self.harvest.base_url.trim().is_empty() {
            return Err(JobcodeError::Config("harvest.base_url is not set".into()));
        }
        HarvestClient::new(
            &self.harvest.base_url,
            self.harvest.credentials.clone(),
            self.request_timeout(),
        )
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (section, service) in [("teamwork", &self.teamwork), ("harvest", &self.harvest)] {
            if service.base_url.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{section}.base_url is empty"),
                });
            }
            if service.credentials.username.is_empty() || service.credentials.password.is_empty()
            {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("{section} credentials are incomplete"),
                });
            }
        }

        let harvest_url = self.harvest.base_url.trim();
        if !harvest_url.is_empty() && !harvest_url.starts_with("https://") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("harvest.base_url '{harvest_url}' does not use https"),
            });
        }

        if self.request_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "request_timeout_secs is 0, requests will fail immediately".into(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
