use crate::report::OperationRecord;

/// Trait for reporting run progress.
///
/// CLI implements with indicatif. All methods have default no-op implementations
/// and may be called from any worker thread.
pub trait ProgressReporter: Send + Sync {
    fn on_tree_scan_start(&self) {}
    fn on_tree_scan_complete(&self, _folders: usize, _duration_secs: f64) {}
    fn on_dispatch_start(&self, _total_jobs: usize) {}
    fn on_job_complete(
        &self,
        _record: &OperationRecord,
        _completed: usize,
        _total_jobs: usize,
    ) {
    }
    fn on_dispatch_complete(&self, _duration_secs: f64) {}
    fn on_report_written(&self, _report_dir: &std::path::Path) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
