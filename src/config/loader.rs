//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_TRANSPORT";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_TRANSPORT_CONFIG";

/// Device variable read by older scripts
const LEGACY_DEVICE_ENV: &str = "SERIAL_PORT";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERIAL_TRANSPORT_CONFIG` environment variable (explicit path)
    /// 2. `./config.toml` (current directory)
    /// 3. `serial-transport/config.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    ///
    /// Environment overrides are still applied. If one is malformed it is
    /// logged and the plain defaults are used.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        if let Err(e) = apply_env_overrides(&mut config) {
            warn!(error = %e, "ignoring environment overrides");
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to file.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self.config_path.as_ref().ok_or(ConfigError::NoSavePath)?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Reload configuration from file (if path is set).
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            self.config = load_from_file(path)?;
            apply_env_overrides(&mut self.config)?;
        }
        Ok(())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    // 4. No config file found - will use defaults
    None
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

fn env_var(key: &str) -> Option<(String, String)> {
    let name = format!("{ENV_PREFIX}_{key}");
    std::env::var(&name).ok().map(|val| (name, val))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_TRANSPORT_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_TRANSPORT_SERIAL_DEVICE=/dev/ttyACM0`
/// - `SERIAL_TRANSPORT_SERIAL_BAUD_RATE=9600`
/// - `SERIAL_TRANSPORT_LOGGING_LEVEL=debug`
///
/// `SERIAL_PORT` is honoured as a device fallback.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let Some((_, val)) = env_var("SERIAL_DEVICE") {
        config.serial.device = Some(val);
    } else if let Ok(val) = std::env::var(LEGACY_DEVICE_ENV) {
        config.serial.device = Some(val);
    }
    if let Some((name, val)) = env_var("SERIAL_BAUD_RATE") {
        config.serial.baud_rate = val
            .parse::<u32>()
            .map_err(|e| ConfigError::env_override(name, &val, format!("{e}")))?;
    }
    if let Some((name, val)) = env_var("SERIAL_READ_TIMEOUT_MS") {
        config.serial.read_timeout_ms = val
            .parse::<u64>()
            .map_err(|e| ConfigError::env_override(name, &val, format!("{e}")))?;
    }
    if let Some((name, val)) = env_var("SERIAL_BACKEND") {
        config.serial.backend = val
            .parse()
            .map_err(|e: String| ConfigError::env_override(name, &val, e))?;
    }

    // Logging overrides
    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((name, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = val
            .parse()
            .map_err(|e: String| ConfigError::env_override(name, &val, e))?;
    }

    Ok(())
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "serial-transport").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}
