use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::thread;

use crate::error::{Error, Result};

pub const DEFAULT_CONFIDENCE: f64 = 0.6;
pub const DEFAULT_SAMPLE_SIZE: usize = 50;
pub const DEFAULT_MAX_CONFLICT_ATTEMPTS: u32 = 999;

pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "@eaDir",
    "#recycle",
    ".DS_Store",
    "venv",
    ".git",
    "lost+found",
    "Thumbs.db",
];

/// Matched as substrings of the file name.
pub const DEFAULT_IGNORED_FILES: &[&str] =
    &["SYNOFILE_THUMB", "desktop.ini", ".DS_Store", "Thumbs.db"];

pub const DEFAULT_IGNORED_EXT: &[&str] =
    &[".db", ".tmp", ".ini", ".txt", ".log", ".json", ".sh", ".py"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    #[default]
    Title,
    Upper,
    Lower,
    Sentence,
}

/// What to do with a folder that yields no dated samples at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingMetadataPolicy {
    /// Record the folder as skipped with reason `no_metadata`.
    #[default]
    Skip,
    /// Record the folder as unchanged, without a warning.
    Ignore,
    /// Ask the configured manual date provider.
    Manual,
}

/// Raw settings as read from `Config.toml` / `FOLDER_DATER_*` variables.
/// Every field has a default so an absent config file is fine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub confidence_threshold: f64,
    pub case_mode: CaseMode,
    pub workers: Option<usize>,
    pub live: bool,
    pub ignore_dirs: Vec<String>,
    pub ignore_ext: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub sample_size: usize,
    pub max_depth: Option<usize>,
    pub filesystem_fallback: bool,
    pub missing_metadata: MissingMetadataPolicy,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE,
            case_mode: CaseMode::default(),
            workers: None,
            live: false,
            ignore_dirs: Vec::new(),
            ignore_ext: Vec::new(),
            ignore_patterns: Vec::new(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_depth: None,
            filesystem_fallback: false,
            missing_metadata: MissingMetadataPolicy::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

pub fn load_configuration() -> Result<Settings> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("FOLDER_DATER").try_parsing(true))
        .build()?;
    Ok(builder.try_deserialize::<Settings>()?)
}

/// Immutable per-run configuration shared by every worker.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub confidence_threshold: f64,
    pub case_mode: CaseMode,
    pub worker_count: usize,
    pub live_mode: bool,
    pub ignore_dirs: BTreeSet<String>,
    pub ignore_files: BTreeSet<String>,
    pub ignore_ext: BTreeSet<String>,
    pub ignore_patterns: Vec<String>,
    pub sample_size: usize,
    pub max_depth: Option<usize>,
    pub filesystem_fallback: bool,
    pub missing_metadata: MissingMetadataPolicy,
    pub max_conflict_attempts: u32,
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Settings::default().build()
    }
}

impl Settings {
    pub fn into_run_config(self) -> Result<RunConfig> {
        self.validate()?;
        Ok(self.build())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::InvalidConfig(format!(
                "confidence threshold must be within 0.0..=1.0, got {}",
                self.confidence_threshold
            )));
        }
        if self.sample_size == 0 {
            return Err(Error::InvalidConfig(
                "sample size must be at least 1".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(Error::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(Error::InvalidConfig(
                "max depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn build(self) -> RunConfig {
        let ignore_dirs = DEFAULT_IGNORED_DIRS
            .iter()
            .map(|d| d.to_string())
            .chain(self.ignore_dirs)
            .collect();
        let ignore_ext = DEFAULT_IGNORED_EXT
            .iter()
            .map(|e| e.to_string())
            .chain(self.ignore_ext)
            .map(|e| normalize_extension(&e))
            .collect();

        RunConfig {
            confidence_threshold: self.confidence_threshold,
            case_mode: self.case_mode,
            worker_count: self.workers.unwrap_or_else(default_worker_count),
            live_mode: self.live,
            ignore_dirs,
            ignore_files: DEFAULT_IGNORED_FILES.iter().map(|f| f.to_string()).collect(),
            ignore_ext,
            ignore_patterns: self.ignore_patterns,
            sample_size: self.sample_size,
            max_depth: self.max_depth,
            filesystem_fallback: self.filesystem_fallback,
            missing_metadata: self.missing_metadata,
            max_conflict_attempts: DEFAULT_MAX_CONFLICT_ATTEMPTS,
            output_dir: self.output_dir,
        }
    }
}

/// Deliberately low to bound disk pressure: half the logical cores, floor 4.
pub fn default_worker_count() -> usize {
    let cores = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores / 2).max(4)
}

/// Lowercase with a leading dot, so `JPG`, `jpg` and `.jpg` compare equal.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.').to_lowercase();
    format!(".{}", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RunConfig::default();
        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.case_mode, CaseMode::Title);
        assert_eq!(config.sample_size, 50);
        assert!(!config.live_mode);
        assert!(config.worker_count >= 4);
        assert!(config.ignore_dirs.contains("@eaDir"));
        assert!(config.ignore_ext.contains(".json"));
    }

    #[test]
    fn test_user_ignore_lists_extend_defaults() {
        let settings = Settings {
            ignore_dirs: vec!["Backups".to_string()],
            ignore_ext: vec!["XMP".to_string(), ".aae".to_string()],
            ..Settings::default()
        };
        let config = settings.into_run_config().unwrap();
        assert!(config.ignore_dirs.contains("Backups"));
        assert!(config.ignore_dirs.contains("#recycle"));
        assert!(config.ignore_ext.contains(".xmp"));
        assert!(config.ignore_ext.contains(".aae"));
        assert!(config.ignore_ext.contains(".db"));
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        let settings = Settings {
            confidence_threshold: 1.5,
            ..Settings::default()
        };
        assert!(matches!(
            settings.into_run_config(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_workers_and_samples() {
        let zero_workers = Settings {
            workers: Some(0),
            ..Settings::default()
        };
        assert!(zero_workers.into_run_config().is_err());

        let zero_samples = Settings {
            sample_size: 0,
            ..Settings::default()
        };
        assert!(zero_samples.into_run_config().is_err());
    }

    #[test]
    fn test_settings_from_toml() {
        let raw = r#"
            confidence_threshold = 0.75
            case_mode = "sentence"
            missing_metadata = "manual"
            ignore_patterns = ["**/Exports/**"]
        "#;
        let settings: Settings = toml::from_str(raw).unwrap();
        assert_eq!(settings.confidence_threshold, 0.75);
        assert_eq!(settings.case_mode, CaseMode::Sentence);
        assert_eq!(settings.missing_metadata, MissingMetadataPolicy::Manual);
        assert_eq!(settings.sample_size, DEFAULT_SAMPLE_SIZE);
        assert_eq!(settings.ignore_patterns, vec!["**/Exports/**".to_string()]);
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("JPG"), ".jpg");
        assert_eq!(normalize_extension(".Heic"), ".heic");
        assert_eq!(normalize_extension(" mp4 "), ".mp4");
    }

    #[test]
    fn test_default_worker_count_floor() {
        assert!(default_worker_count() >= 4);
    }
}
