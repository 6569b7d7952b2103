//! Known launcher install locations and the active install directory.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use compatkit_settings::{Config, expand_home_in, home_dir};
use serde::{Deserialize, Serialize};

/// A launcher directory that can hold compatibility tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallLocation {
    /// Install directory, relative to the user home (`~/...`).
    pub install_dir: String,
    /// Human-readable name.
    pub display_name: String,
    /// Launcher identifier (`steam`, `lutris`). Empty for unknown locations.
    pub launcher: String,
}

impl InstallLocation {
    fn new(install_dir: &str, display_name: &str, launcher: &str) -> Self {
        Self {
            install_dir: install_dir.into(),
            display_name: display_name.into(),
            launcher: launcher.into(),
        }
    }

    /// Returns true if this location was not found in the catalog.
    pub fn is_unknown(&self) -> bool {
        self.launcher.is_empty()
    }
}

/// Returns the built-in catalog of launcher install locations.
pub fn known_locations() -> Vec<InstallLocation> {
    vec![
        InstallLocation::new("~/.steam/root/compatibilitytools.d/", "Steam", "steam"),
        InstallLocation::new(
            "~/.var/app/com.valvesoftware.Steam/data/Steam/compatibilitytools.d/",
            "Steam Flatpak",
            "steam",
        ),
        InstallLocation::new("~/.local/share/lutris/runners/wine/", "Lutris", "lutris"),
        InstallLocation::new(
            "~/.var/app/net.lutris.Lutris/data/lutris/runners/wine/",
            "Lutris Flatpak",
            "lutris",
        ),
    ]
}

/// Install directory requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallTarget {
    /// Read the persisted directory, self-healing to the first available one
    /// once it has disappeared.
    Get,
    /// Select the first catalog location.
    Default,
    /// Select a concrete directory.
    Path(PathBuf),
}

/// Catalog of install locations anchored at a home directory.
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    home: PathBuf,
    locations: Vec<InstallLocation>,
}

impl Default for LocationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationRegistry {
    /// Creates a registry with the built-in catalog and the user's home.
    pub fn new() -> Self {
        Self::with_home(home_dir(), known_locations())
    }

    /// Creates a registry with a custom home directory and catalog.
    pub fn with_home(home: impl Into<PathBuf>, locations: Vec<InstallLocation>) -> Self {
        Self {
            home: home.into(),
            locations,
        }
    }

    /// Returns the catalog.
    pub fn locations(&self) -> &[InstallLocation] {
        &self.locations
    }

    /// Expands a `~`-relative directory against this registry's home.
    pub fn expand(&self, dir: &str) -> PathBuf {
        expand_home_in(dir, &self.home)
    }

    /// Lists catalog directories that currently exist on disk.
    pub fn available_install_directories(&self) -> Vec<PathBuf> {
        self.locations
            .iter()
            .map(|loc| self.expand(&loc.install_dir))
            .filter(|dir| dir.exists())
            .collect()
    }

    /// Finds the catalog entry for `dir`.
    ///
    /// Directories outside the catalog yield a synthetic location with
    /// display name `unknown` and an empty launcher.
    pub fn resolve_location_from_directory(&self, dir: &Path) -> InstallLocation {
        let wanted = self.expand(&dir.to_string_lossy());
        self.locations
            .iter()
            .find(|loc| self.expand(&loc.install_dir) == wanted)
            .cloned()
            .unwrap_or_else(|| InstallLocation {
                install_dir: dir.to_string_lossy().into_owned(),
                display_name: "unknown".into(),
                launcher: String::new(),
            })
    }

    /// Creates the tools folder for every launcher that is installed but
    /// lacks one. Failures are logged and skipped.
    ///
    /// Returns the directories that were created.
    pub fn ensure_compat_tools_folders(&self) -> Vec<PathBuf> {
        let mut created = Vec::new();

        for loc in &self.locations {
            let install_dir = self.expand(&loc.install_dir);
            let Some(parent) = install_dir.parent() else {
                continue;
            };
            if !parent.exists() || install_dir.exists() {
                continue;
            }

            match std::fs::create_dir(&install_dir) {
                Ok(()) => {
                    tracing::info!(
                        path = %install_dir.display(),
                        launcher = %loc.launcher,
                        "created compatibility tools folder"
                    );
                    created.push(install_dir);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %install_dir.display(),
                        error = %e,
                        "failed to create compatibility tools folder"
                    );
                }
            }
        }

        created
    }

    /// Resolves the active install directory.
    ///
    /// A concrete path or [`InstallTarget::Default`] is persisted and
    /// returned. [`InstallTarget::Get`] returns the persisted directory while
    /// it exists on disk, catalog entry or not; otherwise it persists and
    /// returns the first available catalog directory. `None` means no
    /// install location exists.
    pub fn resolve_active_install_directory(
        &self,
        config: &mut Config,
        target: InstallTarget,
    ) -> Option<PathBuf> {
        match target {
            InstallTarget::Path(path) => {
                let dir = with_trailing_separator(&path.to_string_lossy());
                persist_install_dir(config, &dir);
                Some(self.expand(&dir))
            }
            InstallTarget::Default => {
                let first = self.locations.first()?;
                let dir = with_trailing_separator(&first.install_dir);
                persist_install_dir(config, &dir);
                Some(self.expand(&dir))
            }
            InstallTarget::Get => {
                // Directories outside the catalog stay selected while they exist.
                if let Some(current) = config.install_dir.as_deref().map(|d| self.expand(d)) {
                    if current.is_dir() {
                        return Some(current);
                    }
                    tracing::warn!(
                        path = %current.display(),
                        "persisted install directory no longer exists"
                    );
                }

                let first = self.available_install_directories().into_iter().next()?;
                let dir = with_trailing_separator(&first.to_string_lossy());
                tracing::info!(path = %dir, "falling back to first available install directory");
                persist_install_dir(config, &dir);
                Some(PathBuf::from(dir))
            }
        }
    }
}

fn with_trailing_separator(dir: &str) -> String {
    let mut dir = dir.to_string();
    if !dir.ends_with(MAIN_SEPARATOR) {
        dir.push(MAIN_SEPARATOR);
    }
    dir
}

fn persist_install_dir(config: &mut Config, dir: &str) {
    config.install_dir = Some(dir.to_string());
    if let Err(e) = config.save() {
        tracing::warn!(path = %dir, error = %e, "failed to persist install directory");
    }
}
