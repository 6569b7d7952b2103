//! tar.xz archive extraction.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use xz2::read::XzDecoder;

use crate::TransferError;

/// Extracts a `.tar.xz` archive into `destination`.
///
/// Entries keep their archive paths, so the archive's top-level directory
/// becomes a child of `destination`. Entries that would escape
/// `destination` are skipped. Returns the top-level names that were
/// extracted.
pub fn extract_tar_xz_blocking(
    archive: &Path,
    destination: &Path,
) -> Result<Vec<String>, TransferError> {
    std::fs::create_dir_all(destination)?;

    let file = File::open(archive)?;
    let mut tar = tar::Archive::new(XzDecoder::new(BufReader::new(file)));
    tar.set_preserve_mtime(true);

    let mut top_level = BTreeSet::new();
    let entries = tar
        .entries()
        .map_err(|e| TransferError::Archive(format!("failed to read {}: {e}", archive.display())))?;

    let mut directories = Vec::new();
    for entry in entries {
        let mut entry = entry.map_err(|e| TransferError::Archive(e.to_string()))?;
        let path: PathBuf = entry
            .path()
            .map_err(|e| TransferError::Archive(e.to_string()))?
            .into_owned();

        if entry.header().entry_type().is_dir() {
            directories.push((path, entry));
            continue;
        }
        unpack_entry(&mut entry, &path, destination, &mut top_level)?;
    }

    // Directory modes go last, deepest first, so read-only directories
    // do not block their own contents.
    directories.sort_by(|(a, _), (b, _)| b.cmp(a));
    for (path, mut entry) in directories {
        unpack_entry(&mut entry, &path, destination, &mut top_level)?;
    }

    tracing::debug!(
        archive = %archive.display(),
        destination = %destination.display(),
        "archive extracted"
    );
    Ok(top_level.into_iter().collect())
}

fn unpack_entry<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    path: &Path,
    destination: &Path,
    top_level: &mut BTreeSet<String>,
) -> Result<(), TransferError> {
    let unpacked = entry.unpack_in(destination).map_err(|e| {
        TransferError::Archive(format!("failed to unpack {}: {e}", path.display()))
    })?;
    if !unpacked {
        tracing::warn!(entry = %path.display(), "skipped archive entry outside destination");
        return Ok(());
    }

    if let Some(Component::Normal(first)) = path
        .components()
        .find(|c| !matches!(c, Component::CurDir))
    {
        top_level.insert(first.to_string_lossy().into_owned());
    }
    Ok(())
}

/// Async wrapper running [`extract_tar_xz_blocking`] on the blocking pool.
pub async fn extract_tar_xz(
    archive: &Path,
    destination: &Path,
) -> Result<Vec<String>, TransferError> {
    let archive = archive.to_path_buf();
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || extract_tar_xz_blocking(&archive, &destination))
        .await
        .map_err(|e| TransferError::Archive(format!("extraction task failed: {e}")))?
}
