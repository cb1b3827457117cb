use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::path::PathBuf;

use crate::analysis::{VoteOutcome, VoteResult};
use crate::scanner::ScanStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Renamed,
    /// Accepted in a dry run; nothing was touched. Written as `skipped`
    /// with `simulated: true`.
    #[serde(rename = "skipped")]
    DryRun,
    Skipped,
    Unchanged,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Vote,
    Manual,
}

/// One folder's forensic record.
#[derive(Debug, Clone, Serialize)]
pub struct OperationRecord {
    pub original_path: PathBuf,
    /// Where the folder lives now; only set once a live rename succeeded.
    pub new_path: Option<PathBuf>,
    pub status: RecordStatus,
    /// Set on dry-run records that a live run would have renamed.
    pub simulated: bool,
    pub reason: Option<String>,
    pub timestamp: DateTime<Local>,
    pub depth: usize,
    pub decision: Option<VoteOutcome>,
    pub decision_source: Option<DecisionSource>,
    pub confidence: Option<f64>,
    pub mode_date: Option<NaiveDate>,
    pub match_count: usize,
    pub total_samples: usize,
    /// Target chosen after conflict resolution, identical in dry and live runs.
    pub final_target_path: Option<PathBuf>,
    /// Application order of live renames, used to invert them newest first.
    pub sequence: Option<u64>,
    pub scan: Option<ScanStats>,
}

impl OperationRecord {
    pub fn new(original_path: PathBuf, depth: usize) -> Self {
        Self {
            original_path,
            new_path: None,
            status: RecordStatus::Skipped,
            simulated: false,
            reason: None,
            timestamp: Local::now(),
            depth,
            decision: None,
            decision_source: None,
            confidence: None,
            mode_date: None,
            match_count: 0,
            total_samples: 0,
            final_target_path: None,
            sequence: None,
            scan: None,
        }
    }

    pub fn with_vote(mut self, vote: &VoteResult) -> Self {
        self.decision = Some(vote.outcome);
        self.decision_source = Some(DecisionSource::Vote);
        self.confidence = Some(vote.confidence);
        self.mode_date = vote.mode_date;
        self.match_count = vote.match_count;
        self.total_samples = vote.total_samples;
        self
    }

    pub fn with_manual_date(mut self, date: NaiveDate) -> Self {
        self.decision = Some(VoteOutcome::Accept);
        self.decision_source = Some(DecisionSource::Manual);
        self.mode_date = Some(date);
        self
    }

    pub fn with_scan(mut self, stats: ScanStats) -> Self {
        self.scan = Some(stats);
        self
    }

    pub fn finish(mut self, status: RecordStatus, reason: Option<String>) -> Self {
        self.status = status;
        self.simulated = status == RecordStatus::DryRun;
        self.reason = reason;
        self.timestamp = Local::now();
        self
    }

    pub fn folder_name(&self) -> String {
        crate::scanner::file_name(&self.original_path)
    }

    pub fn target_name(&self) -> String {
        self.final_target_path
            .as_deref()
            .map(crate::scanner::file_name)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_is_written_as_simulated_skip() {
        let record = OperationRecord::new(PathBuf::from("/photos/Trip"), 1)
            .finish(RecordStatus::DryRun, Some("dry_run".to_string()));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["simulated"], true);
        assert_eq!(json["reason"], "dry_run");

        let record = OperationRecord::new(PathBuf::from("/photos/Trip"), 1)
            .finish(RecordStatus::Skipped, Some("low_confidence".to_string()));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["simulated"], false);
    }
}
