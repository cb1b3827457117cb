pub mod record;
pub mod slug;
pub mod undo;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::error::Result;
use crate::extract::Capabilities;

pub use record::{DecisionSource, OperationRecord, RecordStatus};
pub use slug::{log_file_name, report_dir, run_slug};

/// Shared, ordered accumulator for operation records. Workers push through a
/// shared reference; the per-folder log line is emitted under the same lock
/// so console and log output never interleave.
#[derive(Debug, Default)]
pub struct ReportLog {
    records: Mutex<Vec<OperationRecord>>,
}

impl ReportLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many records have been collected so far.
    pub fn push(&self, record: OperationRecord) -> usize {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        log_record(&record);
        records.push(record);
        records.len()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_records(self) -> Vec<OperationRecord> {
        self.records.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_record(record: &OperationRecord) {
    let name = record.folder_name();
    let reason = record.reason.as_deref().unwrap_or("");
    match record.status {
        RecordStatus::Renamed => info!("Renamed: {} -> {}", name, record.target_name()),
        RecordStatus::DryRun => info!("[DRY] {} -> {}", name, record.target_name()),
        RecordStatus::Unchanged => debug!("Unchanged: {} ({})", name, reason),
        RecordStatus::Skipped => warn!("Skipped: {} ({})", name, reason),
        RecordStatus::Error => error!("Error: {}: {}", name, reason),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub renamed: usize,
    pub dry_run: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub errored: usize,
}

impl RunSummary {
    pub fn from_records(records: &[OperationRecord]) -> Self {
        let mut summary = RunSummary {
            total: records.len(),
            ..RunSummary::default()
        };
        for record in records {
            match record.status {
                RecordStatus::Renamed => summary.renamed += 1,
                RecordStatus::DryRun => summary.dry_run += 1,
                RecordStatus::Skipped => summary.skipped += 1,
                RecordStatus::Unchanged => summary.unchanged += 1,
                RecordStatus::Error => summary.errored += 1,
            }
        }
        summary
    }
}

/// Everything written to `report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: PathBuf,
    pub generated_at: DateTime<Local>,
    pub live: bool,
    pub config: RunConfig,
    pub capabilities: Capabilities,
    pub summary: RunSummary,
    pub records: Vec<OperationRecord>,
}

impl RunReport {
    pub fn skipped_samples(&self, limit: usize) -> Vec<&OperationRecord> {
        self.records
            .iter()
            .filter(|r| r.status == RecordStatus::Skipped)
            .take(limit)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub report_json: PathBuf,
    pub undo_sh: PathBuf,
    pub undo_ps1: PathBuf,
}

/// Writes `report.json`, `undo.sh` and `undo.ps1` into `dir`.
pub fn write_artifacts(report: &RunReport, dir: &Path) -> Result<ArtifactPaths> {
    fs::create_dir_all(dir)?;
    let paths = ArtifactPaths {
        dir: dir.to_path_buf(),
        report_json: dir.join("report.json"),
        undo_sh: dir.join("undo.sh"),
        undo_ps1: dir.join("undo.ps1"),
    };

    let mut writer = BufWriter::new(File::create(&paths.report_json)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    fs::write(&paths.undo_sh, undo::render_bash(&report.target, &report.records))?;
    make_executable(&paths.undo_sh)?;
    fs::write(
        &paths.undo_ps1,
        undo::render_powershell(&report.target, &report.records),
    )?;

    info!("Forensic report saved to: {}", paths.report_json.display());
    if report.summary.renamed > 0 {
        info!("Undo script saved to: {}", paths.undo_sh.display());
    }
    Ok(paths)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
