//! Batch progress reporting and cancellation.
//!
//! A [`BatchProgress`] is shared by every worker of a batch. Workers check
//! [`BatchProgress::is_cancelled`] before starting a folder and call
//! [`BatchProgress::finish_one`] when they are done with it. Cancellation
//! can come from another thread via [`BatchProgress::cancel`] or from the
//! progress callback returning `false`.
//!
//! ```
//! use mesh_dataset::progress::{BatchProgress, Progress};
//!
//! let progress = BatchProgress::with_callback(10, |p: &Progress| {
//!     eprintln!("{}% {}", p.percent(), p.message);
//!     true
//! });
//! progress.finish_one("sim_0001");
//! assert_eq!(progress.current(), 1);
//! ```

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress information passed to callbacks.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Folders finished so far.
    pub current: u64,
    /// Folders in the batch.
    pub total: u64,
    /// Id of the folder that just finished.
    pub message: String,
    pub elapsed: Duration,
    pub estimated_remaining: Option<Duration>,
}

impl Progress {
    pub fn new(current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
            elapsed: Duration::ZERO,
            estimated_remaining: None,
        }
    }

    /// Progress as a fraction (0.0 to 1.0).
    #[inline]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64) / (self.total as f64)
        }
    }

    /// Progress as a percentage (0 to 100).
    #[inline]
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

/// Callback invoked after each folder.
///
/// Returns `true` to continue, `false` to request cancellation.
pub type ProgressCallback = Box<dyn Fn(&Progress) -> bool + Send + Sync>;

/// Thread-safe progress counter and cancellation flag for a batch.
pub struct BatchProgress {
    current: AtomicU64,
    total: u64,
    cancelled: AtomicBool,
    start_time: Instant,
    callback: Option<ProgressCallback>,
    // Serializes callback invocations so they see increasing counts.
    callback_lock: Mutex<()>,
}

impl std::fmt::Debug for BatchProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProgress")
            .field("current", &self.current())
            .field("total", &self.total)
            .field("cancelled", &self.is_cancelled())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl BatchProgress {
    /// A tracker without a callback.
    pub fn new(total: usize) -> Self {
        Self {
            current: AtomicU64::new(0),
            total: total as u64,
            cancelled: AtomicBool::new(false),
            start_time: Instant::now(),
            callback: None,
            callback_lock: Mutex::new(()),
        }
    }

    /// A tracker that calls `callback` after each finished folder.
    pub fn with_callback(
        total: usize,
        callback: impl Fn(&Progress) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            ..Self::new(total)
        }
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop scheduling new folders. Folders already running finish.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Estimate remaining time from the average folder time so far.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        let current = self.current();
        if current == 0 {
            return None;
        }
        let rate = current as f64 / self.elapsed().as_secs_f64();
        if rate > 0.0 && rate.is_finite() {
            let remaining = self.total.saturating_sub(current) as f64 / rate;
            Some(Duration::from_secs_f64(remaining))
        } else {
            None
        }
    }

    pub fn snapshot(&self, message: impl Into<String>) -> Progress {
        Progress {
            current: self.current(),
            total: self.total,
            message: message.into(),
            elapsed: self.elapsed(),
            estimated_remaining: self.estimated_remaining(),
        }
    }

    /// Record a finished folder and notify the callback.
    ///
    /// Returns `false` if the batch is cancelled.
    pub fn finish_one(&self, id: &str) -> bool {
        let Some(callback) = &self.callback else {
            self.current.fetch_add(1, Ordering::Relaxed);
            return !self.is_cancelled();
        };

        let _guard = self
            .callback_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.current.fetch_add(1, Ordering::Relaxed);
        if !callback(&self.snapshot(id)) {
            self.cancel();
        }
        !self.is_cancelled()
    }
}
