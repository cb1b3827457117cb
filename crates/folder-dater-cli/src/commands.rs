use clap::{Parser, ValueEnum};
use folder_dater_core::{CaseMode, MissingMetadataPolicy, Settings};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "folder-dater")]
#[command(
    about = "Prefix media folders with the date their photos and videos were taken",
    long_about = None
)]
pub struct Cli {
    /// Root folder to organize
    pub target: PathBuf,

    /// Apply renames (default is a dry run)
    #[arg(long)]
    pub live: bool,

    /// Minimum share of samples that must agree on one date (0.0-1.0)
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Case applied to the descriptive part of the name
    #[arg(long = "case", value_enum)]
    pub case_mode: Option<CaseArg>,

    /// Number of folders processed concurrently
    #[arg(long)]
    pub workers: Option<usize>,

    /// Never prompt; folders without metadata are skipped
    #[arg(long)]
    pub non_interactive: bool,

    /// Extra directory names to ignore, comma separated
    #[arg(long, value_delimiter = ',')]
    pub ignore_dirs: Vec<String>,

    /// Extra file extensions to ignore, comma separated
    #[arg(long, value_delimiter = ',')]
    pub ignore_ext: Vec<String>,

    /// Glob matched against folder and file paths; repeatable
    #[arg(long = "ignore-pattern")]
    pub ignore_patterns: Vec<String>,

    /// Maximum files examined per folder
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Only consider folders up to this depth below the target
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Use file modification time when no embedded date exists
    #[arg(long)]
    pub filesystem_fallback: bool,

    /// What to do with folders that have no dated media
    #[arg(long, value_enum)]
    pub missing_metadata: Option<PolicyArg>,

    /// Where reports/ is created
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CaseArg {
    Title,
    Upper,
    Lower,
    Sentence,
}

impl From<CaseArg> for CaseMode {
    fn from(arg: CaseArg) -> Self {
        match arg {
            CaseArg::Title => CaseMode::Title,
            CaseArg::Upper => CaseMode::Upper,
            CaseArg::Lower => CaseMode::Lower,
            CaseArg::Sentence => CaseMode::Sentence,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    Skip,
    Ignore,
    Manual,
}

impl From<PolicyArg> for MissingMetadataPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Skip => MissingMetadataPolicy::Skip,
            PolicyArg::Ignore => MissingMetadataPolicy::Ignore,
            PolicyArg::Manual => MissingMetadataPolicy::Manual,
        }
    }
}

impl Cli {
    /// Flags win over `Config.toml` and `FOLDER_DATER_*` values.
    pub fn apply_to(&self, mut settings: Settings) -> Settings {
        if self.live {
            settings.live = true;
        }
        if let Some(confidence) = self.confidence {
            settings.confidence_threshold = confidence;
        }
        if let Some(case) = self.case_mode {
            settings.case_mode = case.into();
        }
        if self.workers.is_some() {
            settings.workers = self.workers;
        }
        settings.ignore_dirs.extend(self.ignore_dirs.iter().cloned());
        settings.ignore_ext.extend(self.ignore_ext.iter().cloned());
        settings
            .ignore_patterns
            .extend(self.ignore_patterns.iter().cloned());
        if let Some(sample_size) = self.sample_size {
            settings.sample_size = sample_size;
        }
        if self.max_depth.is_some() {
            settings.max_depth = self.max_depth;
        }
        if self.filesystem_fallback {
            settings.filesystem_fallback = true;
        }
        if let Some(policy) = self.missing_metadata {
            settings.missing_metadata = policy.into();
        }
        if self.non_interactive {
            settings.missing_metadata = MissingMetadataPolicy::Skip;
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from([
            "folder-dater",
            "/photos",
            "--live",
            "--confidence",
            "0.8",
            "--case",
            "upper",
            "--ignore-ext",
            "xmp,aae",
            "--missing-metadata",
            "manual",
        ]);
        let settings = cli.apply_to(Settings::default());
        assert!(settings.live);
        assert_eq!(settings.confidence_threshold, 0.8);
        assert_eq!(settings.case_mode, CaseMode::Upper);
        assert_eq!(settings.ignore_ext, vec!["xmp".to_string(), "aae".to_string()]);
        assert_eq!(settings.missing_metadata, MissingMetadataPolicy::Manual);
    }

    #[test]
    fn test_non_interactive_forces_skip() {
        let cli = Cli::parse_from([
            "folder-dater",
            "/photos",
            "--missing-metadata",
            "manual",
            "--non-interactive",
        ]);
        let settings = cli.apply_to(Settings::default());
        assert_eq!(settings.missing_metadata, MissingMetadataPolicy::Skip);
        assert!(!settings.live);
    }
}
