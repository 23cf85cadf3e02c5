//! Terminal progress bars for indexing and downloads.

use std::sync::{Mutex, MutexGuard, PoisonError};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use coursevault_core::{ProgressObserver, SpinnerGuard};

const COUNT_TEMPLATE: &str = "{prefix:>9} [{bar:30}] {pos}/{len} {wide_msg}";
const BYTES_TEMPLATE: &str = "{prefix:>9} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec} {wide_msg}";
const BYTES_UNKNOWN_TEMPLATE: &str = "{prefix:>9} {spinner} {bytes} {bytes_per_sec} {wide_msg}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn slot(bar: &Mutex<Option<ProgressBar>>) -> MutexGuard<'_, Option<ProgressBar>> {
    bar.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Renders progress events on stderr, or nowhere when disabled.
pub(crate) struct ConsoleProgress {
    multi: MultiProgress,
    courses: Mutex<Option<ProgressBar>>,
    items: Mutex<Option<ProgressBar>>,
    files: Mutex<Option<ProgressBar>>,
    transfer: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub(crate) fn new(enabled: bool) -> Self {
        let target = if enabled {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
            courses: Mutex::new(None),
            items: Mutex::new(None),
            files: Mutex::new(None),
            transfer: Mutex::new(None),
        }
    }

    fn counter(&self, prefix: &'static str, len: u64) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(len));
        bar.set_style(style(COUNT_TEMPLATE));
        bar.set_prefix(prefix);
        bar
    }

    fn replace(slot_bar: &Mutex<Option<ProgressBar>>, bar: Option<ProgressBar>) {
        if let Some(previous) = std::mem::replace(&mut *slot(slot_bar), bar) {
            previous.finish_and_clear();
        }
    }

    #[cfg(test)]
    fn position(slot_bar: &Mutex<Option<ProgressBar>>) -> Option<u64> {
        slot(slot_bar).as_ref().map(ProgressBar::position)
    }
}

impl ProgressObserver for ConsoleProgress {
    fn indexing_started(&self, courses: usize) {
        let bar = self.counter("courses", courses as u64);
        Self::replace(&self.courses, Some(bar));
    }

    fn course_started(&self, name: &str, items: usize) {
        let bar = self.counter("items", items as u64);
        bar.set_message(name.to_string());
        Self::replace(&self.items, Some(bar));
        if let Some(courses) = slot(&self.courses).as_ref() {
            courses.set_message(name.to_string());
        }
    }

    fn item_indexed(&self, _files_found: usize) {
        if let Some(items) = slot(&self.items).as_ref() {
            items.inc(1);
        }
    }

    fn course_finished(&self, _name: &str) {
        Self::replace(&self.items, None);
        if let Some(courses) = slot(&self.courses).as_ref() {
            courses.inc(1);
        }
    }

    fn downloads_started(&self, files: usize, _bytes: u64) {
        Self::replace(&self.courses, None);
        let bar = self.counter("files", files as u64);
        Self::replace(&self.files, Some(bar));
    }

    fn transfer_started(&self, name: &str, total_bytes: Option<u64>) {
        let bar = match total_bytes {
            Some(total) if total > 0 => {
                let bar = self.multi.add(ProgressBar::new(total));
                bar.set_style(style(BYTES_TEMPLATE));
                bar
            }
            _ => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(style(BYTES_UNKNOWN_TEMPLATE));
                bar
            }
        };
        bar.set_prefix("fetching");
        bar.set_message(name.to_string());
        Self::replace(&self.transfer, Some(bar));
    }

    fn transfer_progress(&self, bytes: u64) {
        if let Some(transfer) = slot(&self.transfer).as_ref() {
            transfer.inc(bytes);
        }
    }

    fn transfer_finished(&self) {
        Self::replace(&self.transfer, None);
    }

    fn file_finished(&self, name: &str) {
        if let Some(files) = slot(&self.files).as_ref() {
            files.set_message(name.to_string());
            files.inc(1);
        }
    }

    fn spinner(&self, message: &str) -> SpinnerGuard {
        SpinnerGuard::start(self.multi.add(ProgressBar::new_spinner()), message)
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        for bar in [&self.transfer, &self.files, &self.items, &self.courses] {
            Self::replace(bar, None);
        }
    }
}
