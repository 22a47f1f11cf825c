use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, deserialize_optional_duration};

const CONFIG_FILE_NAME: &str = "rublekurs.toml";

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_soap_url() -> String {
    "http://www.cbr.ru/DailyInfoWebServ/DailyInfo.asmx".to_string()
}

fn default_xml_daily_url() -> String {
    "http://www.cbr.ru/scripts/XML_daily.asp".to_string()
}

/// Default timeout for the XML_daily document fetch.
fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Endpoints and timeouts of the Central Bank services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CbrConfig {
    /// DailyInfo SOAP endpoint (GetCursOnDate).
    pub soap_url: String,

    /// XML_daily document endpoint.
    pub xml_daily_url: String,

    /// Timeout for the document fetch.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,

    /// Timeout for the SOAP call. Unset means the call may block until the
    /// remote side gives up.
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub soap_timeout: Option<Duration>,
}

impl Default for CbrConfig {
    fn default() -> Self {
        Self {
            soap_url: default_soap_url(),
            xml_daily_url: default_xml_daily_url(),
            request_timeout: default_request_timeout(),
            soap_timeout: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// IANA timezone used to decide what "today" is for rate lookups.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cbr: CbrConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            timezone: default_timezone(),
            server: ServerConfig::default(),
            cbr: CbrConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the data directory path relative to `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    fn resolve(self, config_dir: &Path) -> Result<ResolvedConfig> {
        let data_dir = self.resolve_data_dir(config_dir);
        let timezone = parse_timezone(&self.timezone)?;
        Ok(ResolvedConfig {
            data_dir,
            timezone,
            server: self.server,
            cbr: self.cbr,
        })
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow!("Invalid timezone {name:?}: {e}"))
}

/// Parse the value of the `PORT` environment variable, if set.
pub fn parse_port_override(value: Option<&str>) -> Result<Option<u16>> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT value: {raw:?}"))
        })
        .transpose()
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Directory holding the user store.
    pub data_dir: PathBuf,
    pub timezone: Tz,
    pub server: ServerConfig,
    pub cbr: CbrConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./rublekurs.toml` if it exists in current directory
/// 2. `~/.local/share/rublekurs/rublekurs.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("rublekurs").join(CONFIG_FILE_NAME);
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        Config::load(&config_path)?.resolve(config_dir)
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the data directory is the config file's intended
    /// parent directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Config::default().resolve(config_dir)
    }

    /// Apply the `PORT` environment variable on top of the file settings.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        let port = std::env::var("PORT").ok();
        if let Some(port) = parse_port_override(port.as_deref())? {
            self.server.port = port;
        }
        Ok(self)
    }
}
