use crate::error::ConfigError;
use crate::toolchain::ToolCommands;
use crate::zone::constants::DEFAULT_TTL;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Prefix of environment variables overriding file settings
pub const ENV_PREFIX: &str = "ZONEKEEPER_";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub server: ServerConfig,
    pub nameserver: NameServerConfig,
    pub tools: ToolCommands,
    /// HTTP Basic credentials. Empty disables authentication.
    pub api_access: Vec<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the admin API listens on
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8053)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NameServerConfig {
    /// Directory holding one `<zone>.zone` file per zone
    pub zone_dir: PathBuf,

    /// Master configuration file the zone declarations live in
    pub config_file: PathBuf,

    /// TTL written as `$TTL` when a zone does not carry its own
    pub default_ttl: u32,
}

impl Default for NameServerConfig {
    fn default() -> Self {
        Self {
            zone_dir: PathBuf::from("/etc/bind/zones"),
            config_file: PathBuf::from("/etc/bind/named.conf.local"),
            default_ttl: DEFAULT_TTL,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct ApiUser {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ApiUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AdminConfig {
    /// Load from an optional TOML file, then apply `ZONEKEEPER_*`
    /// environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Override settings from variables resolved by `lookup`, keyed by
    /// their full `ZONEKEEPER_*` name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(bind_addr) = var("BIND_ADDR") {
            self.server.bind_addr = bind_addr
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", bind_addr)))?;
        }

        if let Some(zone_dir) = var("ZONE_DIR") {
            self.nameserver.zone_dir = PathBuf::from(zone_dir);
        }

        if let Some(config_file) = var("CONFIG_FILE") {
            self.nameserver.config_file = PathBuf::from(config_file);
        }

        if let Some(ttl) = var("DEFAULT_TTL") {
            self.nameserver.default_ttl = ttl
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("invalid default TTL: {}", ttl)))?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nameserver.zone_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("zone_dir must be set".to_string()));
        }

        if self.nameserver.config_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("config_file must be set".to_string()));
        }

        if self.nameserver.default_ttl == 0 {
            return Err(ConfigError::Invalid(
                "default_ttl must be greater than 0".to_string(),
            ));
        }

        if self.tools.check_zone.trim().is_empty() || self.tools.check_config.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "checker programs must be set".to_string(),
            ));
        }

        if self.tools.reload.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(ConfigError::Invalid("reload command must be set".to_string()));
        }

        if self.api_access.iter().any(|user| user.username.is_empty()) {
            return Err(ConfigError::Invalid(
                "api_access entries need a username".to_string(),
            ));
        }

        Ok(())
    }
}
