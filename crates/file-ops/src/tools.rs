//! Installed compatibility tools: listing and removal.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::FileOpsError;

/// Optional marker file inside a tool folder holding a version label.
pub const VERSION_MARKER_FILE: &str = "VERSION.txt";

/// Separator between folder name and version label in a display label.
pub const LABEL_SEPARATOR: &str = " - ";

/// A compatibility tool folder inside an install directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledTool {
    pub folder_name: String,
    pub version_label: Option<String>,
}

impl InstalledTool {
    /// Returns `"<folder> - <label>"`, or the folder name alone.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for InstalledTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_label {
            Some(label) => write!(f, "{}{LABEL_SEPARATOR}{label}", self.folder_name),
            None => write!(f, "{}", self.folder_name),
        }
    }
}

/// Lists the tool folders in `install_dir`.
///
/// A missing or unreadable directory yields an empty list.
pub fn list_installed_tools(install_dir: &Path) -> Vec<InstalledTool> {
    let entries = match std::fs::read_dir(install_dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %install_dir.display(),
                    error = %e,
                    "failed to read install directory"
                );
            }
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| {
            let folder_name = entry.file_name().to_string_lossy().into_owned();
            let version_label = read_version_marker(&entry.path());
            InstalledTool {
                folder_name,
                version_label,
            }
        })
        .collect()
}

fn read_version_marker(tool_dir: &Path) -> Option<String> {
    let marker = tool_dir.join(VERSION_MARKER_FILE);
    if !marker.is_file() {
        return None;
    }

    match std::fs::read_to_string(&marker) {
        Ok(content) => {
            let label = content.trim();
            (!label.is_empty()).then(|| label.to_string())
        }
        Err(e) => {
            tracing::warn!(path = %marker.display(), error = %e, "failed to read version marker");
            None
        }
    }
}

/// Returns the folder name encoded in a display label.
pub fn folder_name_from_label(label: &str) -> &str {
    label
        .split_once(LABEL_SEPARATOR)
        .map_or(label, |(folder, _)| folder)
}

/// Deletes the tool folder named by `label` from `install_dir`.
///
/// Returns `Ok(false)` if the folder does not exist.
pub fn remove_tool(label: &str, install_dir: &Path) -> Result<bool, FileOpsError> {
    let folder = folder_name_from_label(label);

    // Only a single plain path component may be removed.
    let mut components = Path::new(folder).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err(FileOpsError::InvalidLabel(label.to_string()));
    }

    let target = install_dir.join(folder);
    let metadata = match std::fs::symlink_metadata(&target) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        std::fs::remove_dir_all(&target)?;
    } else {
        std::fs::remove_file(&target)?;
    }

    tracing::info!(path = %target.display(), "removed compatibility tool");
    Ok(true)
}
