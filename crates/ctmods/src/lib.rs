//! Compatibility tool providers.
//!
//! A provider knows where a tool's releases are published, which release
//! asset to install and how the installed folder is named. Archive-based
//! providers share [`ArchiveInstaller`].

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use compatkit_transfer::ProgressReporter;

pub mod github;
pub mod installer;
pub mod kron4ek;
pub mod system;

pub use github::{AssetFilter, Release, ReleaseAsset, ReleaseCatalogClient, ReleaseMetadata};
pub use installer::{ArchiveInstaller, InstallRecipe, InstallState};
pub use kron4ek::Kron4ekVanilla;
pub use system::{GlibcVersion, check_system_compatibility, parse_ldd_version};

/// Errors from provider setup and release queries.
#[derive(Debug, thiserror::Error)]
pub enum CtError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

/// A compatibility tool that can be listed and installed.
pub trait CompatTool: Send + Sync {
    /// Stable identifier used on the command line.
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Launchers the tool can be installed for (`"steam"`, `"lutris"`).
    fn launchers(&self) -> &'static [&'static str];

    /// Fetches download metadata for a release tag or `"latest"`.
    fn fetch_release_metadata<'a>(
        &'a self,
        tag: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<ReleaseMetadata>> + Send + 'a>>;

    /// Lists up to `limit` release tags, newest first.
    fn fetch_releases(&self, limit: u32) -> Pin<Box<dyn Future<Output = Vec<String>> + Send + '_>>;

    /// Returns true if the host can run the tool.
    fn is_system_compatible(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;

    /// Installs a release into `install_dir`, using `temp_dir` for the
    /// download. Returns whether the install succeeded.
    fn install<'a>(
        &'a self,
        version: &'a str,
        install_dir: &'a Path,
        temp_dir: &'a Path,
        progress: &'a ProgressReporter,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

    /// Web page describing a release.
    fn release_info_url(&self, version: &str) -> String;
}

/// Returns every known provider.
pub fn available_tools() -> Result<Vec<Box<dyn CompatTool>>, CtError> {
    Ok(vec![Box::new(Kron4ekVanilla::new()?)])
}

/// Returns the provider with the given id.
pub fn tool_by_id(id: &str) -> Result<Option<Box<dyn CompatTool>>, CtError> {
    Ok(available_tools()?.into_iter().find(|t| t.id() == id))
}

/// Returns the providers that support `launcher`.
pub fn tools_for_launcher(launcher: &str) -> Result<Vec<Box<dyn CompatTool>>, CtError> {
    Ok(available_tools()?
        .into_iter()
        .filter(|t| t.launchers().contains(&launcher))
        .collect())
}
