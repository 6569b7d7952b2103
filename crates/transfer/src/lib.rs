//! Streamed archive download with progress reporting, and tar.xz extraction.

mod download;
mod extract;
mod progress;

pub use download::{archive_file_name, download_to_file};
pub use extract::{extract_tar_xz, extract_tar_xz_blocking};
pub use progress::{
    PROGRESS_DONE, PROGRESS_DOWNLOAD_MAX, PROGRESS_DOWNLOADED, PROGRESS_STARTED, ProgressCallback,
    ProgressReporter, download_percent,
};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("incomplete download: received {received} of {expected} bytes")]
    Incomplete { expected: u64, received: u64 },

    #[error("archive error: {0}")]
    Archive(String),
}
