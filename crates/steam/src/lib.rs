pub mod applist;
pub mod compat_mapping;
pub mod paths;
pub mod vdf;

// Re-export primary types.
pub use applist::{AppListCache, STEAM_APPLIST_URL, SteamApp};
pub use compat_mapping::{MAPPING_UNAVAILABLE, find_games_using_tool, is_mapping_unavailable};
pub use paths::{Paths, steam_base_dir};
pub use vdf::{KeyValues, Value, load_vdf, parse_vdf};

/// Errors for Steam operations.
#[derive(Debug, thiserror::Error)]
pub enum SteamError {
    #[error("steam installation not found")]
    NotFound,

    #[error("VDF parse error: {0}")]
    Vdf(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::io::Error> for SteamError {
    fn from(e: std::io::Error) -> Self {
        SteamError::Io(e.to_string())
    }
}
