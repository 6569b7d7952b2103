use std::path::{Path, PathBuf};

use compatkit_settings::home_dir;

use crate::SteamError;

/// Provides access to Steam directory paths.
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Creates a new `Paths` instance with auto-detected Steam directory.
    pub fn new() -> Result<Self, SteamError> {
        let base_dir = steam_base_dir(&home_dir()).ok_or(SteamError::NotFound)?;
        Ok(Self { base_dir })
    }

    /// Creates a new `Paths` instance with a custom base directory.
    pub fn with_base(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the Steam base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the global config directory.
    pub fn config_dir(&self) -> PathBuf {
        self.base_dir.join("config")
    }

    /// Returns the path to `config.vdf`, which holds the compat tool mapping.
    pub fn config_vdf_path(&self) -> PathBuf {
        self.config_dir().join("config.vdf")
    }
}

/// Returns the first existing Steam base directory under `home`.
///
/// Checks `~/.steam/steam`, `~/.local/share/Steam`, then the Flatpak install.
pub fn steam_base_dir(home: &Path) -> Option<PathBuf> {
    let candidates = [
        home.join(".steam").join("steam"),
        home.join(".local").join("share").join("Steam"),
        home.join(".var")
            .join("app")
            .join("com.valvesoftware.Steam")
            .join(".steam")
            .join("steam"),
    ];

    candidates.into_iter().find(|dir| dir.exists())
}
