//! Progress reporting seam between the pipeline and whatever renders it.
//!
//! The library only emits events. Rendering lives in the binary; tests and
//! unattended runs use [`NoProgress`]. Observers never influence control flow.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Tick interval for busy spinners.
pub const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Receives indexing and download progress events.
///
/// Every method has a no-op default so implementors pick what they render.
pub trait ProgressObserver: Send + Sync {
    /// The course list was fetched.
    fn indexing_started(&self, _courses: usize) {}

    /// A course is about to be traversed; `items` counts its module items.
    fn course_started(&self, _name: &str, _items: usize) {}

    /// One module item was visited.
    fn item_indexed(&self, _files_found: usize) {}

    /// A course finished (successfully or not).
    fn course_finished(&self, _name: &str) {}

    /// The download pass is about to fetch `files` entries.
    fn downloads_started(&self, _files: usize, _bytes: u64) {}

    /// A response body is about to be streamed to disk.
    fn transfer_started(&self, _name: &str, _total_bytes: Option<u64>) {}

    /// `bytes` more bytes were written.
    fn transfer_progress(&self, _bytes: u64) {}

    /// The current transfer ended, successfully or not.
    fn transfer_finished(&self) {}

    /// One pending entry was handled.
    fn file_finished(&self, _name: &str) {}

    /// Starts a busy indicator that lives as long as the returned guard.
    fn spinner(&self, _message: &str) -> SpinnerGuard {
        SpinnerGuard::hidden()
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Scoped busy indicator.
///
/// The spinner ticks on its own thread until the guard is dropped; dropping
/// stops the tick thread and clears the line on every exit path.
#[derive(Debug)]
#[must_use = "the spinner stops as soon as the guard is dropped"]
pub struct SpinnerGuard {
    bar: Option<ProgressBar>,
}

impl SpinnerGuard {
    /// Wraps `bar` and starts ticking it.
    pub fn start(bar: ProgressBar, message: &str) -> Self {
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(SPINNER_TICK);
        Self { bar: Some(bar) }
    }

    /// A guard with nothing to stop.
    pub fn hidden() -> Self {
        Self { bar: None }
    }

    /// Returns true when a spinner is attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.bar.is_some()
    }
}

impl Drop for SpinnerGuard {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spinner_is_hidden() {
        let guard = NoProgress.spinner("working");
        assert!(!guard.is_active());
    }

    #[test]
    fn test_spinner_guard_finishes_bar_on_drop() {
        let bar = ProgressBar::hidden();
        let guard = SpinnerGuard::start(bar.clone(), "fetching");
        assert!(guard.is_active());
        assert!(!bar.is_finished());
        drop(guard);
        assert!(bar.is_finished());
    }

    #[test]
    fn test_spinner_guard_stops_on_early_return() {
        fn fails(bar: &ProgressBar) -> Result<(), &'static str> {
            let _spinner = SpinnerGuard::start(bar.clone(), "fetching");
            Err("network down")
        }

        let bar = ProgressBar::hidden();
        assert!(fails(&bar).is_err());
        assert!(bar.is_finished());
    }
}
