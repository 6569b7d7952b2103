//! Filesystem side of compatibility tool management.
//!
//! Resolves launcher install locations, lists and removes installed tools,
//! and orders tool names for presentation.

mod locations;
mod ordering;
mod tools;

pub use locations::{InstallLocation, InstallTarget, LocationRegistry, known_locations};
pub use ordering::sort_tool_names;
pub use tools::{
    InstalledTool, LABEL_SEPARATOR, VERSION_MARKER_FILE, folder_name_from_label,
    list_installed_tools, remove_tool,
};

/// Errors produced by file operations.
#[derive(Debug, thiserror::Error)]
pub enum FileOpsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid tool label: {0:?}")]
    InvalidLabel(String),
}
