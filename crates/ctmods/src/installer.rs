//! Download-and-extract install pipeline shared by archive-based tools.

use std::path::Path;

use compatkit_transfer::{
    PROGRESS_DONE, ProgressReporter, archive_file_name, download_to_file, extract_tar_xz,
};

use crate::github::{AssetFilter, ReleaseCatalogClient};
use crate::system::{GlibcVersion, check_system_compatibility};

/// Install pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    CheckingCompatibility,
    FetchingMetadata,
    Downloading,
    ReplacingExisting,
    Extracting,
    Done,
    Failed,
}

impl InstallState {
    /// Returns true for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// How a tool's releases are selected and laid out on disk.
#[derive(Debug, Clone)]
pub struct InstallRecipe {
    /// Picks the release asset to download.
    pub asset_filter: AssetFilter,
    /// Installed folder is `prefix + lowercase(version) + suffix`.
    pub folder_prefix: &'static str,
    pub folder_suffix: &'static str,
    /// Host glibc required to run the tool; `None` skips the check.
    pub min_glibc: Option<GlibcVersion>,
}

impl InstallRecipe {
    /// Returns the folder a release extracts into.
    pub fn folder_name(&self, version: &str) -> String {
        format!(
            "{}{}{}",
            self.folder_prefix,
            version.to_lowercase(),
            self.folder_suffix
        )
    }
}

/// Runs one install of a release archive.
///
/// Any existing installation of the same version is removed before the new
/// archive is extracted, so a failed extraction leaves neither copy.
pub struct ArchiveInstaller<'a> {
    catalog: &'a ReleaseCatalogClient,
    recipe: &'a InstallRecipe,
    state: InstallState,
    error: Option<String>,
}

impl<'a> ArchiveInstaller<'a> {
    pub fn new(catalog: &'a ReleaseCatalogClient, recipe: &'a InstallRecipe) -> Self {
        Self {
            catalog,
            recipe,
            state: InstallState::Idle,
            error: None,
        }
    }

    /// Current pipeline stage.
    pub fn state(&self) -> InstallState {
        self.state
    }

    /// Reason for the last failure, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Installs `version` (a release tag or `"latest"`) into `install_dir`,
    /// downloading the archive into `temp_dir`.
    ///
    /// Progress reaches 99 when the download finishes and 100 only after a
    /// successful extraction. Returns whether the install succeeded.
    pub async fn install(
        &mut self,
        version: &str,
        install_dir: &Path,
        temp_dir: &Path,
        progress: &ProgressReporter,
    ) -> bool {
        self.state = InstallState::Idle;
        self.error = None;

        if let Some(minimum) = self.recipe.min_glibc {
            self.transition(InstallState::CheckingCompatibility);
            if !check_system_compatibility(minimum).await {
                return self.fail(format!("system glibc older than {minimum} or undetectable"));
            }
        }

        self.transition(InstallState::FetchingMetadata);
        let Some(meta) = self
            .catalog
            .fetch_release_metadata(version, self.recipe.asset_filter)
            .await
        else {
            return self.fail(format!("no release metadata for {version}"));
        };
        let Some(url) = meta.download_url.as_deref() else {
            return self.fail(format!("release {} has no matching asset", meta.version));
        };

        self.transition(InstallState::Downloading);
        let archive = temp_dir.join(archive_file_name(url));
        if let Err(e) =
            download_to_file(self.catalog.http(), url, &archive, meta.size_bytes, progress).await
        {
            return self.fail(format!("download of {url} failed: {e}"));
        }

        self.transition(InstallState::ReplacingExisting);
        let tool_dir = install_dir.join(self.recipe.folder_name(&meta.version));
        if tool_dir.exists() {
            let target = tool_dir.clone();
            let removed =
                tokio::task::spawn_blocking(move || std::fs::remove_dir_all(&target)).await;
            match removed {
                Ok(Ok(())) => {
                    tracing::info!(path = %tool_dir.display(), "removed existing installation");
                }
                Ok(Err(e)) => {
                    return self.fail(format!("failed to remove {}: {e}", tool_dir.display()));
                }
                Err(e) => return self.fail(format!("removal task failed: {e}")),
            }
        }

        self.transition(InstallState::Extracting);
        if let Err(e) = extract_tar_xz(&archive, install_dir).await {
            return self.fail(format!("extraction of {} failed: {e}", archive.display()));
        }

        if let Err(e) = tokio::fs::remove_file(&archive).await {
            tracing::debug!(
                path = %archive.display(),
                error = %e,
                "could not remove downloaded archive"
            );
        }

        progress.report(PROGRESS_DONE);
        self.transition(InstallState::Done);
        tracing::info!(
            version = %meta.version,
            path = %tool_dir.display(),
            "compatibility tool installed"
        );
        true
    }

    fn transition(&mut self, next: InstallState) {
        tracing::debug!(from = ?self.state, to = ?next, "install state");
        self.state = next;
    }

    fn fail(&mut self, reason: String) -> bool {
        tracing::warn!(stage = ?self.state, %reason, "install failed");
        self.state = InstallState::Failed;
        self.error = Some(reason);
        false
    }
}
