//! User directories shared by every crate in the workspace.

use std::path::{Path, PathBuf};

/// Returns the user's home directory, or the system temp directory if it
/// cannot be determined.
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir)
}

/// Returns the user config directory (`$XDG_CONFIG_HOME` or `~/.config`).
pub fn config_home() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| home_dir().join(".config"))
}

/// Returns the user cache directory (`$XDG_CACHE_HOME` or `~/.cache`).
pub fn cache_home() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(|| home_dir().join(".cache"))
}

/// Expands a leading `~` component against `home`.
///
/// Only a bare `~` component is expanded; `~user/...` is returned unchanged.
pub fn expand_home_in(path: impl AsRef<Path>, home: &Path) -> PathBuf {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home.to_path_buf(),
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Expands a leading `~` component to the user's home directory.
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    expand_home_in(path, &home_dir())
}
