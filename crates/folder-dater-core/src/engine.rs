use chrono::{Local, NaiveDate};
use rayon::{Scope, ThreadPoolBuilder};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analysis::{
    compose_name, DateSanitizer, DateVoter, NameSanitizer, RejectReason, VoteResult,
};
use crate::config::{MissingMetadataPolicy, RunConfig};
use crate::error::{Error, Result};
use crate::extract::{Capabilities, DateExtractor, MediaDateExtractor};
use crate::progress::ProgressReporter;
use crate::rename::{ConflictResolver, RenameExecutor, RenameOutcome};
use crate::report::{
    self, ArtifactPaths, OperationRecord, RecordStatus, ReportLog, RunReport, RunSummary,
};
use crate::scanner::{self, FolderEntry, IgnoreRules, MediaSample, MetadataScanner, ScanStats};

/// Supplies a date for folders that carry no usable metadata.
pub trait ManualDateProvider: Send + Sync {
    fn provide_date(&self, folder: &Path) -> Option<NaiveDate>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    ScanTree,
    BuildJobs,
    Dispatch,
    Collect,
    Report,
    Done,
}

/// Per-folder unit of work, owned by the worker that runs it.
#[derive(Debug, Clone)]
pub struct FolderJob {
    pub folder_path: PathBuf,
    pub depth: usize,
    pub samples: Vec<MediaSample>,
    pub scan_stats: Option<ScanStats>,
    pub decision: Option<VoteResult>,
    pub manual_date: Option<NaiveDate>,
    pub candidate_name: Option<String>,
    pub final_target_path: Option<PathBuf>,
}

impl FolderJob {
    pub fn new(entry: &FolderEntry) -> Self {
        Self {
            folder_path: entry.path.clone(),
            depth: entry.depth,
            samples: Vec::new(),
            scan_stats: None,
            decision: None,
            manual_date: None,
            candidate_name: None,
            final_target_path: None,
        }
    }

    fn into_record(self, status: RecordStatus, reason: Option<&str>) -> OperationRecord {
        let mut record = OperationRecord::new(self.folder_path, self.depth);
        if let Some(vote) = &self.decision {
            record = record.with_vote(vote);
        }
        if let Some(date) = self.manual_date {
            record = record.with_manual_date(date);
        }
        if let Some(stats) = self.scan_stats {
            record = record.with_scan(stats);
        }
        record.final_target_path = self.final_target_path;
        record.finish(status, reason.map(str::to_string))
    }

    fn settle(self, status: RecordStatus, reason: &str) -> Plan {
        Plan::Settled(self.into_record(status, Some(reason)))
    }
}

#[derive(Debug)]
pub struct RunResult {
    pub report: RunReport,
    pub artifacts: ArtifactPaths,
    pub scan_duration: Duration,
    pub dispatch_duration: Duration,
}

pub struct RenameEngine {
    config: RunConfig,
    extractor: Arc<dyn DateExtractor>,
    manual: Option<Arc<dyn ManualDateProvider>>,
    sanitizer: DateSanitizer,
}

impl RenameEngine {
    pub fn new(config: RunConfig) -> Self {
        let extractor = MediaDateExtractor::with_default_readers()
            .with_filesystem_fallback(config.filesystem_fallback);
        Self {
            config,
            extractor: Arc::new(extractor),
            manual: None,
            sanitizer: DateSanitizer::for_today(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DateExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_manual_provider(mut self, provider: Arc<dyn ManualDateProvider>) -> Self {
        self.manual = Some(provider);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: DateSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.extractor.capabilities()
    }

    /// Runs the whole pipeline against `target`:
    /// 1. Enumerate every folder once, post-order
    /// 2. Dispatch one job per folder to the worker pool, parents after children
    /// 3. Write `report.json` and the undo scripts
    ///
    /// Only initialization problems are returned as errors; per-folder
    /// failures end up as `error` records.
    pub fn run(&self, target: &Path, reporter: &dyn ProgressReporter) -> Result<RunResult> {
        let target = validate_target(target)?;
        let mut state = RunState::ScanTree;
        debug!("Run state: {:?}", state);

        info!("Target: {}", target.display());
        info!(
            "Mode: {}, workers: {}, confidence: {:.2}",
            if self.config.live_mode { "LIVE" } else { "DRY RUN" },
            self.config.worker_count,
            self.config.confidence_threshold,
        );

        reporter.on_tree_scan_start();
        let scan_start = Instant::now();
        let rules = Arc::new(IgnoreRules::from_config(&self.config));
        let folders = scanner::build_folder_list(&target, &rules, self.config.max_depth);
        let scan_duration = scan_start.elapsed();
        reporter.on_tree_scan_complete(folders.len(), scan_duration.as_secs_f64());
        info!("{} folders found in {:.2}s", folders.len(), scan_duration.as_secs_f64());

        advance(&mut state, RunState::BuildJobs);
        let (nodes, group_count) = build_job_graph(folders);
        let groups: Vec<Mutex<SiblingGroup>> =
            (0..group_count).map(|_| Mutex::default()).collect();
        let pipeline = FolderPipeline {
            scanner: MetadataScanner::new(
                Arc::clone(&self.extractor),
                rules,
                self.sanitizer,
                self.config.sample_size,
            ),
            voter: DateVoter::new(self.config.confidence_threshold),
            namer: NameSanitizer::new(self.config.case_mode),
            executor: RenameExecutor::new(
                self.config.live_mode,
                ConflictResolver::new(self.config.max_conflict_attempts),
            ),
            sanitizer: self.sanitizer,
            missing_metadata: self.config.missing_metadata,
            manual: self.manual.clone(),
        };

        advance(&mut state, RunState::Dispatch);
        let log = ReportLog::new();
        let dispatch_start = Instant::now();
        reporter.on_dispatch_start(nodes.len());
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count)
            .thread_name(|i| format!("folder-dater-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("Failed to start worker pool: {}", e)))?;
        let dispatch = Dispatch {
            nodes: &nodes,
            groups: &groups,
            pipeline: &pipeline,
            log: &log,
            reporter,
        };
        pool.scope(|s| {
            for (idx, node) in nodes.iter().enumerate() {
                if node.pending_children.load(Ordering::Acquire) == 0 {
                    dispatch.submit(s, idx);
                }
            }
        });
        let dispatch_duration = dispatch_start.elapsed();
        reporter.on_dispatch_complete(dispatch_duration.as_secs_f64());

        advance(&mut state, RunState::Collect);
        let records = log.into_records();
        let summary = RunSummary::from_records(&records);

        advance(&mut state, RunState::Report);
        let report = RunReport {
            target: target.clone(),
            generated_at: Local::now(),
            live: self.config.live_mode,
            config: self.config.clone(),
            capabilities: self.extractor.capabilities(),
            summary,
            records,
        };
        let dir = report::report_dir(&self.config.output_dir, &target);
        let artifacts = report::write_artifacts(&report, &dir)?;
        reporter.on_report_written(&artifacts.dir);

        advance(&mut state, RunState::Done);
        Ok(RunResult {
            report,
            artifacts,
            scan_duration,
            dispatch_duration,
        })
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug!("Run state: {:?} -> {:?}", state, next);
    *state = next;
}

fn validate_target(target: &Path) -> Result<PathBuf> {
    if !target.exists() {
        return Err(Error::TargetNotFound(target.to_path_buf()));
    }
    if !target.is_dir() {
        return Err(Error::NotADirectory(target.to_path_buf()));
    }
    // Read it once so an unreadable root fails before any job starts.
    fs::read_dir(target)?;
    Ok(fs::canonicalize(target)?)
}

struct JobNode {
    entry: FolderEntry,
    parent: Option<usize>,
    /// Folders sharing a parent directory form one sibling group.
    group: usize,
    /// Position among siblings, in name order.
    rank: usize,
    pending_children: AtomicUsize,
}

/// Siblings can collide on a target name, so their renames are applied in
/// rank order. Plans that arrive early wait in `ready`; whichever worker
/// delivers the plan for `next` applies it and every consecutive one after it.
#[derive(Default)]
struct SiblingGroup {
    next: usize,
    ready: BTreeMap<usize, (usize, Plan)>,
}

/// Links each folder to its parent job, counts the children every parent
/// has to wait for, and ranks siblings. Returns the nodes and the number of
/// sibling groups.
fn build_job_graph(folders: Vec<FolderEntry>) -> (Vec<JobNode>, usize) {
    let index: HashMap<PathBuf, usize> = folders
        .iter()
        .enumerate()
        .map(|(i, f)| (f.path.clone(), i))
        .collect();
    let parents: Vec<Option<usize>> = folders
        .iter()
        .map(|f| f.path.parent().and_then(|p| index.get(p).copied()))
        .collect();
    let mut child_counts = vec![0usize; folders.len()];
    for parent in parents.iter().flatten() {
        child_counts[*parent] += 1;
    }

    // Post-order keeps siblings in name order relative to each other.
    let mut groups: HashMap<PathBuf, (usize, usize)> = HashMap::new();
    let placement: Vec<(usize, usize)> = folders
        .iter()
        .map(|f| {
            let parent_dir = f.path.parent().map(Path::to_path_buf).unwrap_or_default();
            let next_group = groups.len();
            let slot = groups.entry(parent_dir).or_insert((next_group, 0));
            let placed = *slot;
            slot.1 += 1;
            placed
        })
        .collect();
    let group_count = groups.len();

    let nodes = folders
        .into_iter()
        .zip(parents)
        .zip(child_counts)
        .zip(placement)
        .map(|(((entry, parent), children), (group, rank))| JobNode {
            entry,
            parent,
            group,
            rank,
            pending_children: AtomicUsize::new(children),
        })
        .collect();
    (nodes, group_count)
}

struct Dispatch<'a> {
    nodes: &'a [JobNode],
    groups: &'a [Mutex<SiblingGroup>],
    pipeline: &'a FolderPipeline,
    log: &'a ReportLog,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> Dispatch<'a> {
    /// Plans one job in parallel, then hands it to its sibling group.
    fn submit<'s>(&'s self, scope: &Scope<'s>, idx: usize) {
        scope.spawn(move |s| {
            let node = &self.nodes[idx];
            let plan = self.pipeline.plan(&node.entry);

            let mut group = self.groups[node.group]
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            group.ready.insert(node.rank, (idx, plan));
            loop {
                let next = group.next;
                let Some((ready_idx, plan)) = group.ready.remove(&next) else {
                    break;
                };
                group.next += 1;
                let record = self.pipeline.apply(plan);
                self.complete(s, ready_idx, record);
            }
        });
    }

    /// Records the outcome; the last child to finish submits its parent.
    fn complete<'s>(&'s self, scope: &Scope<'s>, idx: usize, record: OperationRecord) {
        let completed = self.log.push(record.clone());
        self.reporter.on_job_complete(&record, completed, self.nodes.len());

        if let Some(parent) = self.nodes[idx].parent {
            if self.nodes[parent].pending_children.fetch_sub(1, Ordering::AcqRel) == 1 {
                self.submit(scope, parent);
            }
        }
    }
}

/// What a folder's job decided before touching the filesystem.
enum Plan {
    /// Nothing to rename; the record is final.
    Settled(OperationRecord),
    Rename { job: FolderJob, candidate: PathBuf },
}

/// Scan -> vote -> sanitize runs freely in parallel; resolve -> execute runs
/// in sibling order.
struct FolderPipeline {
    scanner: MetadataScanner,
    voter: DateVoter,
    namer: NameSanitizer,
    executor: RenameExecutor,
    sanitizer: DateSanitizer,
    missing_metadata: MissingMetadataPolicy,
    manual: Option<Arc<dyn ManualDateProvider>>,
}

impl FolderPipeline {
    fn plan(&self, entry: &FolderEntry) -> Plan {
        let mut job = FolderJob::new(entry);

        let outcome = match self.scanner.scan(&job.folder_path) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Cannot read {}: {}", job.folder_path.display(), e);
                let reason = format!("unreadable folder: {}", e);
                return job.settle(RecordStatus::Error, &reason);
            }
        };
        job.samples = outcome.samples;
        job.scan_stats = Some(outcome.stats);

        let vote = self.voter.vote_samples(&job.samples);
        let accepted = vote.accepted_date();
        let reject_reason = vote.reject_reason;
        job.decision = Some(vote);

        let date = match (accepted, reject_reason) {
            (Some(date), _) => date,
            (None, Some(RejectReason::NoMetadata)) => {
                let reason = RejectReason::NoMetadata.as_str();
                match self.missing_metadata {
                    MissingMetadataPolicy::Skip => {
                        return job.settle(RecordStatus::Skipped, reason);
                    }
                    MissingMetadataPolicy::Ignore => {
                        return job.settle(RecordStatus::Unchanged, reason);
                    }
                    MissingMetadataPolicy::Manual => match self.ask_manual(&job.folder_path) {
                        Some(date) => {
                            job.manual_date = Some(date);
                            date
                        }
                        None => return job.settle(RecordStatus::Skipped, reason),
                    },
                }
            }
            (None, _) => {
                let reason = RejectReason::LowConfidence.as_str();
                return job.settle(RecordStatus::Skipped, reason);
            }
        };

        let current_name = scanner::file_name(&job.folder_path);
        let candidate_name = compose_name(date, &self.namer.clean(&current_name));
        let candidate = job.folder_path.with_file_name(&candidate_name);
        job.candidate_name = Some(candidate_name);
        Plan::Rename { job, candidate }
    }

    fn apply(&self, plan: Plan) -> OperationRecord {
        let (mut job, candidate) = match plan {
            Plan::Settled(record) => return record,
            Plan::Rename { job, candidate } => (job, candidate),
        };

        match self.executor.execute(&job.folder_path, &candidate) {
            RenameOutcome::Renamed { target, sequence } => {
                job.final_target_path = Some(target.clone());
                let mut record = job.into_record(RecordStatus::Renamed, None);
                record.new_path = Some(target);
                record.sequence = Some(sequence);
                record
            }
            RenameOutcome::Simulated { target } => {
                job.final_target_path = Some(target);
                job.into_record(RecordStatus::DryRun, Some("dry_run"))
            }
            RenameOutcome::Unchanged => {
                job.final_target_path = Some(candidate);
                job.into_record(RecordStatus::Unchanged, Some("already_named"))
            }
            RenameOutcome::Failed { target, error } => {
                job.final_target_path = target;
                let reason = error.to_string();
                job.into_record(RecordStatus::Error, Some(&reason))
            }
        }
    }

    fn ask_manual(&self, folder: &Path) -> Option<NaiveDate> {
        let provider = self.manual.as_ref()?;
        let date = provider.provide_date(folder)?;
        if self.sanitizer.is_valid(date) {
            Some(date)
        } else {
            warn!("Ignoring out-of-range manual date {} for {}", date, folder.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, depth: usize) -> FolderEntry {
        FolderEntry {
            path: PathBuf::from(path),
            depth,
        }
    }

    #[test]
    fn test_job_graph_links_parents() {
        let (nodes, groups) = build_job_graph(vec![
            entry("/r/a/x", 2),
            entry("/r/a/y", 2),
            entry("/r/a", 1),
            entry("/r/b", 1),
        ]);
        assert_eq!(nodes[0].parent, Some(2));
        assert_eq!(nodes[1].parent, Some(2));
        assert_eq!(nodes[2].parent, None);
        assert_eq!(nodes[2].pending_children.load(Ordering::SeqCst), 2);
        assert_eq!(nodes[3].pending_children.load(Ordering::SeqCst), 0);

        assert_eq!(groups, 2);
        assert_eq!((nodes[0].group, nodes[0].rank), (0, 0));
        assert_eq!((nodes[1].group, nodes[1].rank), (0, 1));
        assert_eq!((nodes[2].group, nodes[2].rank), (1, 0));
        assert_eq!((nodes[3].group, nodes[3].rank), (1, 1));
    }

    #[test]
    fn test_missing_target_is_fatal() {
        let result = validate_target(Path::new("/definitely/not/here/folder-dater"));
        assert!(matches!(result, Err(Error::TargetNotFound(_))));
    }
}
