use chartsync_core::catalog::DEFAULT_FETCH_DELAY;
use chartsync_core::discovery::locator::{DEFAULT_KEY, DEFAULT_PREFIX, DEFAULT_TIMEOUT};
use chartsync_core::pipeline::DEFAULT_WRITE_DELAY;
use chartsync_core::{Credential, LocatorOptions, Platform};
use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// One side of a migration, as written in the config file
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct EndpointFile {
    platform: Option<Platform>,
    base_url: Option<String>,
    session_cookie: Option<String>,
    user_id: Option<String>,
}

/// A platform to read from or write to
#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub platform: Platform,
    pub base_url: String,
    /// Cookie header for platforms that authenticate by browser session
    #[serde(serialize_with = "serialize_masked")]
    pub session_cookie: Option<String>,
    /// FXReplay user id; falls back to the settings file when unset
    pub user_id: Option<String>,
}

impl Endpoint {
    fn resolve(file: Option<EndpointFile>, default_platform: Platform) -> Self {
        let file = file.unwrap_or_default();
        let platform = file.platform.unwrap_or(default_platform);
        Self {
            platform,
            base_url: file
                .base_url
                .unwrap_or_else(|| platform.default_base_url().to_string()),
            session_cookie: file.session_cookie,
            user_id: file.user_id,
        }
    }
}

/// Where and how to look for the access token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// JSON snapshot of the host page's global objects
    pub namespace_file: Option<PathBuf>,
    pub prefix: String,
    pub key: String,
    pub timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            namespace_file: None,
            prefix: DEFAULT_PREFIX.to_string(),
            key: DEFAULT_KEY.to_string(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl DiscoveryConfig {
    pub fn locator_options(&self) -> LocatorOptions {
        LocatorOptions {
            prefix: self.prefix.clone(),
            key: self.key.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Pauses between platform requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub fetch_delay_ms: u64,
    pub write_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            fetch_delay_ms: DEFAULT_FETCH_DELAY.as_millis() as u64,
            write_delay_ms: DEFAULT_WRITE_DELAY.as_millis() as u64,
        }
    }
}

impl PacingConfig {
    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    pub fn write_delay(&self) -> Duration {
        Duration::from_millis(self.write_delay_ms)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Backup file written by fetch and read by apply when no file is given
    pub backup_path: ConfigValue<PathBuf>,
    /// Key/value storage standing in for the page's localStorage
    pub settings_file: ConfigValue<PathBuf>,
    pub source: Endpoint,
    pub destination: Endpoint,
    pub discovery: DiscoveryConfig,
    pub pacing: PacingConfig,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    backup_path: Option<PathBuf>,
    settings_file: Option<PathBuf>,
    source: Option<EndpointFile>,
    destination: Option<EndpointFile>,
    discovery: Option<DiscoveryConfig>,
    pacing: Option<PacingConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = Self::default_data_dir();

        // Start with defaults
        let mut backup_path =
            ConfigValue::new(data_dir.join("backup.json"), ConfigSource::Default);
        let mut settings_file =
            ConfigValue::new(data_dir.join("settings.json"), ConfigSource::Default);
        let mut source = Endpoint::resolve(None, Platform::Tradingview);
        let mut destination = Endpoint::resolve(None, Platform::Fxreplay);
        let mut discovery = DiscoveryConfig::default();
        let mut pacing = PacingConfig::default();
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(p) = file_config.backup_path {
                backup_path = ConfigValue::new(relative_to(&path, p), ConfigSource::File);
            }
            if let Some(p) = file_config.settings_file {
                settings_file = ConfigValue::new(relative_to(&path, p), ConfigSource::File);
            }
            source = Endpoint::resolve(file_config.source, Platform::Tradingview);
            destination = Endpoint::resolve(file_config.destination, Platform::Fxreplay);
            if let Some(d) = file_config.discovery {
                discovery = d;
                discovery.namespace_file = discovery
                    .namespace_file
                    .map(|p| relative_to(&path, p));
            }
            if let Some(p) = file_config.pacing {
                pacing = p;
            }
        }

        // Apply environment variable overrides
        if let Ok(p) = std::env::var("CHARTSYNC_BACKUP_PATH") {
            backup_path = ConfigValue::new(PathBuf::from(p), ConfigSource::Environment);
        }
        if let Ok(p) = std::env::var("CHARTSYNC_SETTINGS_FILE") {
            settings_file = ConfigValue::new(PathBuf::from(p), ConfigSource::Environment);
        }
        if let Ok(cookie) = std::env::var("CHARTSYNC_SOURCE_COOKIE") {
            source.session_cookie = Some(cookie);
        }
        if let Ok(cookie) = std::env::var("CHARTSYNC_DESTINATION_COOKIE") {
            destination.session_cookie = Some(cookie);
        }
        if let Ok(user) = std::env::var("CHARTSYNC_USER_ID") {
            source.user_id = Some(user.clone());
            destination.user_id = Some(user);
        }
        if let Ok(p) = std::env::var("CHARTSYNC_NAMESPACE_FILE") {
            discovery.namespace_file = Some(PathBuf::from(p));
        }

        Ok(Self {
            backup_path,
            settings_file,
            source,
            destination,
            discovery,
            pacing,
            config_file,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/chartsync/
    /// - macOS: ~/Library/Application Support/chartsync/
    /// - Windows: %APPDATA%/chartsync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chartsync")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/chartsync/
    /// - macOS: ~/Library/Application Support/chartsync/
    /// - Windows: %APPDATA%/chartsync/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chartsync")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn relative_to(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

pub fn mask(secret: &str) -> String {
    Credential::new(secret).masked()
}

fn serialize_masked<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(secret) => s.serialize_some(&mask(secret)),
        None => s.serialize_none(),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
