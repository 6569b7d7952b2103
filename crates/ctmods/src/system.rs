//! Host compatibility checks.

use std::fmt;

/// A glibc release, compared as `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GlibcVersion {
    pub major: u32,
    pub minor: u32,
}

impl GlibcVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for GlibcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Parses the glibc version from `ldd --version` output.
///
/// The version is the last token of the first line, e.g.
/// `ldd (Ubuntu GLIBC 2.35-0ubuntu3.1) 2.35`.
pub fn parse_ldd_version(output: &str) -> Option<GlibcVersion> {
    let token = output.lines().next()?.split_whitespace().last()?;
    let mut parts = token.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some(GlibcVersion { major, minor })
}

/// Returns the host glibc version, or `None` if it cannot be determined.
pub async fn detect_glibc_version() -> Option<GlibcVersion> {
    let output = match tokio::process::Command::new("ldd")
        .arg("--version")
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(error = %e, "failed to run ldd");
            return None;
        }
    };

    if !output.status.success() {
        tracing::warn!(status = %output.status, "ldd --version failed");
        return None;
    }

    let version = parse_ldd_version(&String::from_utf8_lossy(&output.stdout));
    if version.is_none() {
        tracing::warn!("unrecognized ldd --version output");
    }
    version
}

/// Returns true if the host glibc is at least `minimum`.
///
/// Returns false when the version cannot be determined.
pub async fn check_system_compatibility(minimum: GlibcVersion) -> bool {
    match detect_glibc_version().await {
        Some(found) if found >= minimum => true,
        Some(found) => {
            tracing::warn!(%found, required = %minimum, "glibc too old");
            false
        }
        None => false,
    }
}
