use folder_dater_core::report::RecordStatus;
use folder_dater_core::{OperationRecord, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const DISPATCH_TEMPLATE: &str =
    "  {spinner:.cyan} Folders [{bar:30.cyan/dim}] {pos}/{len} ({eta} remaining) {msg}";

/// Spinner while the tree is walked, bar while folders are processed.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    /// Runs `f` with the progress bar hidden, for interactive prompts.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        let guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_tree_scan_start(&self) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICKS));
        }
        pb.set_message("Enumerating folders...");
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_tree_scan_complete(&self, folders: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Tree scan complete: {} folders in {:.2}s",
            folders, duration_secs
        );
    }

    fn on_dispatch_start(&self, total_jobs: usize) {
        let pb = ProgressBar::new(total_jobs as u64);
        if let Ok(style) = ProgressStyle::with_template(DISPATCH_TEMPLATE) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICKS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_job_complete(&self, record: &OperationRecord, completed: usize, total_jobs: usize) {
        let guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = guard.as_ref() {
            if pb.length() != Some(total_jobs as u64) {
                pb.set_length(total_jobs as u64);
            }
            pb.set_position(completed as u64);
            if record.status == RecordStatus::Error {
                pb.set_message(format!("error in {}", record.folder_name()));
            }
        }
    }

    fn on_dispatch_complete(&self, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Processing complete in {:.2}s",
            duration_secs
        );
    }

    fn on_report_written(&self, report_dir: &Path) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Report and undo scripts written to {}",
            report_dir.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_dispatch_bar_shows_last_error() {
        assert!(DISPATCH_TEMPLATE.contains("{msg}"));

        let reporter = CliReporter::new();
        reporter.on_dispatch_start(2);
        let record = OperationRecord::new(PathBuf::from("/photos/Broken"), 1)
            .finish(RecordStatus::Error, Some("denied".to_string()));
        reporter.on_job_complete(&record, 1, 2);

        let guard = reporter.bar.lock().unwrap();
        let pb = guard.as_ref().unwrap();
        assert_eq!(pb.position(), 1);
        assert_eq!(pb.message(), "error in Broken");
    }
}
