use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc;

/// First value emitted once the download connection is established.
pub const PROGRESS_STARTED: u8 = 1;

/// Upper bound for byte-proportional download progress.
pub const PROGRESS_DOWNLOAD_MAX: u8 = 98;

/// Download finished, extraction pending.
pub const PROGRESS_DOWNLOADED: u8 = 99;

/// Installation finished.
pub const PROGRESS_DONE: u8 = 100;

/// Callback invoked with a progress percentage.
pub type ProgressCallback = Box<dyn Fn(u8) + Send + Sync>;

/// Delivers monotonic progress percentages to a subscriber.
///
/// Only values strictly greater than the last delivered one reach the
/// callback; repeats and regressions are dropped.
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last: AtomicU8,
}

impl ProgressReporter {
    /// Creates a reporter that forwards to `callback`.
    pub fn new(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            last: AtomicU8::new(0),
        }
    }

    /// Creates a reporter that only tracks the last value.
    pub fn silent() -> Self {
        Self {
            callback: None,
            last: AtomicU8::new(0),
        }
    }

    /// Creates a reporter whose values are delivered through a channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<u8>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Self::new(move |percent| {
            let _ = tx.send(percent);
        });
        (reporter, rx)
    }

    /// Reports `percent` (clamped to 100).
    pub fn report(&self, percent: u8) {
        let percent = percent.min(PROGRESS_DONE);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent <= previous {
            return;
        }

        tracing::trace!(percent, "progress");
        if let Some(cb) = &self.callback {
            cb(percent);
        }
    }

    /// Returns the last delivered value (0 before anything was reported).
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.last())
            .finish_non_exhaustive()
    }
}

/// Maps downloaded bytes to the `0..=98` progress range.
pub fn download_percent(written: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = (written as f64 / total as f64) * f64::from(PROGRESS_DOWNLOAD_MAX);
    scaled.min(f64::from(PROGRESS_DOWNLOAD_MAX)) as u8
}
