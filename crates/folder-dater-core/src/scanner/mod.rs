pub mod metadata;
pub mod walk;

use chrono::NaiveDate;
use glob::Pattern;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::error;

use crate::config::{normalize_extension, RunConfig};
use crate::extract::DateSource;

pub use metadata::{MetadataScanner, ScanOutcome, ScanStats};
pub use walk::{build_folder_list, FolderEntry};

/// One file's contribution to a folder vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaSample {
    pub path: PathBuf,
    pub extracted_date: Option<NaiveDate>,
    pub source: DateSource,
    pub valid: bool,
}

impl MediaSample {
    pub fn new(
        path: PathBuf,
        extracted_date: Option<NaiveDate>,
        source: DateSource,
        valid: bool,
    ) -> Self {
        Self {
            path,
            extracted_date,
            source,
            valid,
        }
    }
}

/// Directory, file and extension exclusions plus glob ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    dirs: BTreeSet<String>,
    file_fragments: BTreeSet<String>,
    extensions: BTreeSet<String>,
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    pub fn from_config(config: &RunConfig) -> Self {
        let patterns = config
            .ignore_patterns
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            dirs: config.ignore_dirs.clone(),
            file_fragments: config.ignore_files.clone(),
            extensions: config.ignore_ext.clone(),
            patterns,
        }
    }

    pub fn ignores_dir(&self, path: &Path) -> bool {
        let name = file_name(path);
        self.dirs.contains(&name) || self.matches_pattern(path)
    }

    pub fn ignores_file(&self, path: &Path) -> bool {
        let name = file_name(path);
        if self.file_fragments.iter().any(|f| name.contains(f.as_str())) {
            return true;
        }
        if let Some(ext) = extension_of(path) {
            if self.extensions.contains(&ext) {
                return true;
            }
        }
        self.matches_pattern(path)
    }

    fn matches_pattern(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches_path(path))
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Normalized extension (lowercase, leading dot).
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| normalize_extension(&e.to_string_lossy()))
}
