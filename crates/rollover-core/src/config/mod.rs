use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cookie::{Cookie, CookieOptions, SameSite};
use crate::error::ConfigError;
use crate::session::cookie_store::CookieSessionStorage;
use crate::session::store::SessionStorage;

/// Root configuration for rollover.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub session: SessionConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub cookie: CookieConfig,
    pub storage: StorageKind,
    /// Refresh the cookie's expiry on every request that carries one.
    pub rolling: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie: CookieConfig::default(),
            storage: StorageKind::Cookie,
            rolling: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// All session data lives in the signed cookie.
    Cookie,
    /// The cookie carries an id; data stays in process memory.
    Memory,
}

impl std::str::FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid(format!("unknown storage: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CookieConfig {
    pub name: String,
    /// Signing secrets; the first signs, all verify.
    pub secrets: Vec<String>,
    pub max_age: Option<i64>,
    pub domain: Option<String>,
    pub path: String,
    pub same_site: SameSite,
    pub http_only: bool,
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "__session".to_string(),
            secrets: Vec::new(),
            max_age: Some(60 * 60 * 24 * 7),
            domain: None,
            path: "/".to_string(),
            same_site: SameSite::Lax,
            http_only: true,
            secure: false,
        }
    }
}

impl CookieConfig {
    pub fn options(&self) -> CookieOptions {
        CookieOptions {
            max_age: self.max_age,
            expires: None,
            domain: self.domain.clone(),
            path: Some(self.path.clone()),
            same_site: Some(self.same_site),
            http_only: self.http_only,
            secure: self.secure,
        }
    }

    pub fn build(&self) -> Cookie {
        Cookie::new(&self.name, self.options()).with_secrets(self.secrets.iter().cloned())
    }
}

impl SessionConfig {
    /// Build the configured session storage.
    pub fn create_storage(&self) -> Arc<dyn SessionStorage> {
        let cookie = self.cookie.build();
        match self.storage {
            StorageKind::Cookie => Arc::new(CookieSessionStorage::new(cookie)),
            #[cfg(feature = "memory-backend")]
            StorageKind::Memory => {
                Arc::new(crate::session::memory_store::memory_session_storage(cookie))
            }
            #[cfg(not(feature = "memory-backend"))]
            StorageKind::Memory => {
                tracing::warn!("Memory storage not available; falling back to cookie storage");
                Arc::new(CookieSessionStorage::new(cookie))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Load configuration from environment variables.
///
/// Priority:
/// 1. `ROLLOVER_CONFIG` env var: full JSON config
/// 2. Individual env vars (merged on top of the file config)
/// 3. File fallback (`~/.rollover/config.json`)
pub fn load_config_from_env() -> Config {
    if let Ok(json) = std::env::var("ROLLOVER_CONFIG") {
        match serde_json::from_str::<Config>(&json) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!("Failed to parse ROLLOVER_CONFIG: {}", e);
            }
        }
    }

    apply_env_overrides(load_config(None))
}

/// Overlay the individual `ROLLOVER_*` variables on `cfg`.
pub fn apply_env_overrides(mut cfg: Config) -> Config {
    if let Ok(v) = std::env::var("ROLLOVER_SESSION_SECRET") {
        cfg.session.cookie.secrets = v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(v) = std::env::var("ROLLOVER_COOKIE_NAME") {
        cfg.session.cookie.name = v;
    }
    if let Ok(v) = std::env::var("ROLLOVER_MAX_AGE") {
        match v.parse() {
            Ok(secs) => cfg.session.cookie.max_age = Some(secs),
            Err(e) => tracing::warn!("Ignoring ROLLOVER_MAX_AGE={}: {}", v, e),
        }
    }
    if let Ok(v) = std::env::var("ROLLOVER_ROLLING") {
        cfg.session.rolling = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes");
    }
    if let Ok(v) = std::env::var("ROLLOVER_STORAGE") {
        match v.parse() {
            Ok(kind) => cfg.session.storage = kind,
            Err(e) => tracing::warn!("Ignoring ROLLOVER_STORAGE: {}", e),
        }
    }
    if let Ok(v) = std::env::var("ROLLOVER_PORT") {
        match v.parse() {
            Ok(port) => cfg.server.port = port,
            Err(e) => tracing::warn!("Ignoring ROLLOVER_PORT={}: {}", v, e),
        }
    }

    cfg
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rollover")
        .join("config.json")
}

/// Load configuration from file or create default.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Config>(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse config from {}: {}", path.display(), e);
                    tracing::warn!("Using default configuration.");
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config from {}: {}", path.display(), e);
                tracing::warn!("Using default configuration.");
            }
        }
    }

    Config::default()
}

/// Save configuration to file.
pub fn save_config(config: &Config, config_path: Option<&Path>) -> Result<(), ConfigError> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(())
}
