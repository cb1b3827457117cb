use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error};

use super::resolve::{exists_on_disk, ConflictResolver};
use crate::error::Error;

#[derive(Debug)]
pub enum RenameOutcome {
    /// Live rename applied. `sequence` orders renames by application time.
    Renamed { target: PathBuf, sequence: u64 },
    /// Dry run: nothing touched, `target` is what a live run would use.
    Simulated { target: PathBuf },
    /// The folder already carries the composed name.
    Unchanged,
    Failed {
        target: Option<PathBuf>,
        error: Error,
    },
}

#[derive(Debug, Default)]
struct RenameState {
    /// Targets handed out during this run.
    claimed: HashSet<PathBuf>,
    /// Sources a dry run pretends to have moved away.
    vacated: HashSet<PathBuf>,
    next_sequence: u64,
}

/// Serializes every filesystem mutation of a run behind one lock. Conflict
/// resolution happens under the same lock so two workers can never be handed
/// the same target.
pub struct RenameExecutor {
    live: bool,
    resolver: ConflictResolver,
    state: Mutex<RenameState>,
}

impl RenameExecutor {
    pub fn new(live: bool, resolver: ConflictResolver) -> Self {
        Self {
            live,
            resolver,
            state: Mutex::new(RenameState::default()),
        }
    }

    pub fn execute(&self, source: &Path, candidate: &Path) -> RenameOutcome {
        if source == candidate {
            return RenameOutcome::Unchanged;
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let target = {
            let state = &*state;
            let is_taken = |p: &Path| {
                state.claimed.contains(p) || (exists_on_disk(p) && !state.vacated.contains(p))
            };
            match self.resolver.resolve(candidate, is_taken) {
                Ok(target) => target,
                Err(error) => {
                    error!("{}", error);
                    return RenameOutcome::Failed {
                        target: None,
                        error,
                    };
                }
            }
        };

        if !source.is_dir() {
            let error = Error::Rename {
                from: source.to_path_buf(),
                to: target.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "source folder missing"),
            };
            return RenameOutcome::Failed {
                target: Some(target),
                error,
            };
        }

        if !self.live {
            state.claimed.insert(target.clone());
            state.vacated.insert(source.to_path_buf());
            return RenameOutcome::Simulated { target };
        }

        match fs::rename(source, &target) {
            Ok(()) => {
                state.claimed.insert(target.clone());
                let sequence = state.next_sequence;
                state.next_sequence += 1;
                debug!("Renamed #{}: {} -> {}", sequence, source.display(), target.display());
                RenameOutcome::Renamed { target, sequence }
            }
            Err(err) => RenameOutcome::Failed {
                error: Error::Rename {
                    from: source.to_path_buf(),
                    to: target.clone(),
                    source: err,
                },
                target: Some(target),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn executor(live: bool) -> RenameExecutor {
        RenameExecutor::new(live, ConflictResolver::new(20))
    }

    #[test]
    fn test_live_rename_moves_folder() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("2.8.26 Trip");
        fs::create_dir(&source).unwrap();
        let candidate = tmp.path().join("2026-02-08 Trip");

        match executor(true).execute(&source, &candidate) {
            RenameOutcome::Renamed { target, sequence } => {
                assert_eq!(target, candidate);
                assert_eq!(sequence, 0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!source.exists());
        assert!(candidate.is_dir());
    }

    #[test]
    fn test_dry_run_touches_nothing_but_claims_target() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        let candidate = tmp.path().join("2026-02-08 Trip");
        let exec = executor(false);

        let first = exec.execute(&a, &candidate);
        let second = exec.execute(&b, &candidate);

        assert!(matches!(first, RenameOutcome::Simulated { ref target } if *target == candidate));
        let expected = tmp.path().join("2026-02-08 Trip (1)");
        assert!(matches!(
            second,
            RenameOutcome::Simulated { ref target } if *target == expected
        ));
        assert!(a.exists() && b.exists());
        assert!(!candidate.exists());
    }

    #[test]
    fn test_dry_run_treats_vacated_source_as_free() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("Trip");
        let b = tmp.path().join("2026 trip");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        let exec = executor(false);

        exec.execute(&a, &tmp.path().join("2026-01-01 Trip"));
        let outcome = exec.execute(&b, &a);
        assert!(matches!(outcome, RenameOutcome::Simulated { ref target } if *target == a));
    }

    #[test]
    fn test_same_name_is_unchanged() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("2026-02-08 Trip");
        fs::create_dir(&source).unwrap();
        assert!(matches!(
            executor(true).execute(&source, &source),
            RenameOutcome::Unchanged
        ));
    }

    #[test]
    fn test_missing_source_fails_without_side_effects() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("gone");
        let candidate = tmp.path().join("2026-02-08 Gone");

        let outcome = executor(true).execute(&source, &candidate);
        assert!(matches!(outcome, RenameOutcome::Failed { error: Error::Rename { .. }, .. }));
        assert!(!candidate.exists());
    }

    #[test]
    fn test_sequence_increases() {
        let tmp = tempdir().unwrap();
        let exec = executor(true);
        let mut sequences = Vec::new();
        for name in ["a", "b", "c"] {
            let source = tmp.path().join(name);
            fs::create_dir(&source).unwrap();
            if let RenameOutcome::Renamed { sequence, .. } =
                exec.execute(&source, &tmp.path().join(format!("2026-01-01 {}", name)))
            {
                sequences.push(sequence);
            }
        }
        assert_eq!(sequences, vec![0, 1, 2]);
    }
}
