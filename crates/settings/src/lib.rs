//! Persisted user configuration.
//!
//! Configuration is stored as TOML at
//! `$XDG_CONFIG_HOME/compatkit/config.toml` (or `~/.config/compatkit/config.toml`).
//! It is loaded once at startup and passed explicitly to the operations that
//! need it; nothing in the workspace keeps a global copy.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod user_dirs;

pub use user_dirs::{cache_home, config_home, expand_home, expand_home_in, home_dir};

/// Directory name under the user config directory.
pub const APP_DIR: &str = "compatkit";

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Errors from loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown theme: {0}")]
    UnknownTheme(String),
}

/// Colour theme preference. An unset theme means "follow the desktop".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(SettingsError::UnknownTheme(other.to_string())),
        }
    }
}

/// User configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Theme override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,

    /// Active install directory, stored with a trailing separator.
    #[serde(default, rename = "installdir", skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<String>,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Config {
    /// Loads the configuration from the default location.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(config_path())
    }

    /// Loads the configuration from `path`.
    ///
    /// A missing file yields the default configuration bound to `path`,
    /// so a later [`save`](Self::save) creates it.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };

        tracing::debug!(path = %path.display(), "configuration loaded");
        config.path = Some(path);
        Ok(config)
    }

    /// Returns the file this configuration is persisted to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Saves the configuration. In-memory configurations are not persisted.
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the default configuration file path.
pub fn config_path() -> PathBuf {
    config_home().join(APP_DIR).join(CONFIG_FILE)
}
