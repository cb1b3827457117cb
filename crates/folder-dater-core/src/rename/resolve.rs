use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Finds a free sibling name by appending ` (1)`, ` (2)`, ...
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver {
    max_attempts: u32,
}

impl ConflictResolver {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Returns `candidate` itself when free, otherwise the first free
    /// suffixed variant. `is_taken` decides what counts as occupied.
    pub fn resolve<F>(&self, candidate: &Path, is_taken: F) -> Result<PathBuf>
    where
        F: Fn(&Path) -> bool,
    {
        if !is_taken(candidate) {
            return Ok(candidate.to_path_buf());
        }

        let base = candidate
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for n in 1..=self.max_attempts {
            let attempt = candidate.with_file_name(format!("{} ({})", base, n));
            if !is_taken(&attempt) {
                return Ok(attempt);
            }
        }

        Err(Error::ConflictExhausted {
            path: candidate.to_path_buf(),
            attempts: self.max_attempts,
        })
    }
}

/// True for anything present at `path`, including dangling symlinks.
pub fn exists_on_disk(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
