//! Kron4ek Wine-Builds, vanilla amd64 flavour.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use compatkit_transfer::ProgressReporter;

use crate::github::{ReleaseCatalogClient, ReleaseMetadata};
use crate::installer::{ArchiveInstaller, InstallRecipe};
use crate::system::{GlibcVersion, check_system_compatibility};
use crate::{CompatTool, CtError};

pub const KRON4EK_RELEASES_URL: &str = "https://api.github.com/repos/Kron4ek/Wine-Builds/releases";
pub const KRON4EK_INFO_URL: &str = "https://github.com/Kron4ek/Wine-Builds/releases/tag/";

/// Oldest glibc the builds link against.
pub const KRON4EK_MIN_GLIBC: GlibcVersion = GlibcVersion::new(2, 27);

fn is_vanilla_amd64(asset_name: &str) -> bool {
    asset_name.ends_with("tar.xz")
        && asset_name.contains("amd64")
        && !asset_name.contains("staging")
}

/// Install layout: `wine-<version>-amd64`, unpacked from the release tarball.
pub fn recipe() -> InstallRecipe {
    InstallRecipe {
        asset_filter: is_vanilla_amd64,
        folder_prefix: "wine-",
        folder_suffix: "-amd64",
        min_glibc: Some(KRON4EK_MIN_GLIBC),
    }
}

/// Vanilla Wine builds for Lutris.
pub struct Kron4ekVanilla {
    catalog: ReleaseCatalogClient,
    recipe: InstallRecipe,
}

impl Kron4ekVanilla {
    pub const ID: &'static str = "kron4ek-vanilla";

    pub fn new() -> Result<Self, CtError> {
        Ok(Self::with_catalog(ReleaseCatalogClient::new(
            KRON4EK_RELEASES_URL,
        )?))
    }

    /// Uses `catalog` instead of the public GitHub endpoint.
    pub fn with_catalog(catalog: ReleaseCatalogClient) -> Self {
        Self {
            catalog,
            recipe: recipe(),
        }
    }
}

impl CompatTool for Kron4ekVanilla {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Kron4ek Wine-Builds Vanilla"
    }

    fn description(&self) -> &'static str {
        "Vanilla Wine builds by Kron4ek, for Lutris."
    }

    fn launchers(&self) -> &'static [&'static str] {
        &["lutris"]
    }

    fn fetch_release_metadata<'a>(
        &'a self,
        tag: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<ReleaseMetadata>> + Send + 'a>> {
        Box::pin(self.catalog.fetch_release_metadata(tag, self.recipe.asset_filter))
    }

    fn fetch_releases(&self, limit: u32) -> Pin<Box<dyn Future<Output = Vec<String>> + Send + '_>> {
        Box::pin(self.catalog.list_available_release_tags(limit))
    }

    fn is_system_compatible(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(check_system_compatibility(KRON4EK_MIN_GLIBC))
    }

    fn install<'a>(
        &'a self,
        version: &'a str,
        install_dir: &'a Path,
        temp_dir: &'a Path,
        progress: &'a ProgressReporter,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            ArchiveInstaller::new(&self.catalog, &self.recipe)
                .install(version, install_dir, temp_dir, progress)
                .await
        })
    }

    fn release_info_url(&self, version: &str) -> String {
        format!("{KRON4EK_INFO_URL}{version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_filter_picks_vanilla_amd64() {
        assert!(is_vanilla_amd64("wine-9.0-amd64.tar.xz"));
        assert!(is_vanilla_amd64("wine-9.0-amd64-wow64.tar.xz"));
        assert!(!is_vanilla_amd64("wine-9.0-staging-amd64.tar.xz"));
        assert!(!is_vanilla_amd64("wine-9.0-x86.tar.xz"));
        assert!(!is_vanilla_amd64("wine-9.0-amd64.tar.xz.sha256"));
    }

    #[test]
    fn folder_layout() {
        assert_eq!(recipe().folder_name("9.0"), "wine-9.0-amd64");
        assert_eq!(recipe().min_glibc, Some(GlibcVersion::new(2, 27)));
    }

    #[test]
    fn provider_identity() {
        let tool = Kron4ekVanilla::new().unwrap();
        assert_eq!(tool.id(), "kron4ek-vanilla");
        assert_eq!(tool.launchers(), &["lutris"]);
        assert_eq!(
            tool.release_info_url("9.0"),
            "https://github.com/Kron4ek/Wine-Builds/releases/tag/9.0"
        );
    }
}
