use crate::constants::{
    DEFAULT_IMPORT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_PORT, DEVTO_BASE_URL,
};
use crate::error::{ImportError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "importer.toml";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub devto: DevToConfig,
    pub server: ServerConfig,
    pub cli: CliConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DevToConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for DevToConfig {
    fn default() -> Self {
        Self {
            base_url: DEVTO_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl DevToConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub import_timeout_secs: u64,
    pub enable_importer: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            import_timeout_secs: DEFAULT_IMPORT_TIMEOUT.as_secs(),
            enable_importer: true,
        }
    }
}

impl ServerConfig {
    pub fn import_timeout(&self) -> Duration {
        Duration::from_secs(self.import_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub run_timeout_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            run_timeout_secs: DEFAULT_IMPORT_TIMEOUT.as_secs(),
        }
    }
}

impl CliConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Config {
    /// Defaults, then `importer.toml` (or `$IMPORTER_CONFIG`), then the environment.
    pub fn load() -> Result<Self> {
        let path = env::var("IMPORTER_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let mut config = match path {
            Some(explicit) => Self::from_file(&explicit)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ImportError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `DATABASE_URL`, `LIBSQL_AUTH_TOKEN`, `DEVTO_BASE_URL` and `PORT`
    /// from `lookup`, ignoring blank values.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(token) = get("LIBSQL_AUTH_TOKEN") {
            self.database.auth_token = Some(token);
        }
        if let Some(base) = get("DEVTO_BASE_URL") {
            self.devto.base_url = base;
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database
            .url
            .as_deref()
            .ok_or_else(|| ImportError::Config("DATABASE_URL environment variable is required".into()))
    }
}
