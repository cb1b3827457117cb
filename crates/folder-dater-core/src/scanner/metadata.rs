use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use super::{extension_of, file_name, IgnoreRules, MediaSample};
use crate::analysis::DateSanitizer;
use crate::extract::{DateExtractor, MediaKind};

/// Per-folder counters, kept for the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Files handed to the extractor.
    pub examined: usize,
    /// Matched an ignore rule.
    pub ignored: usize,
    /// Not an image or video extension.
    pub unsupported: usize,
    /// Needed a reader that is not available in this run.
    pub capability_missing: usize,
    /// Supported files left unread because the sample cap was reached.
    pub beyond_cap: usize,
    /// The extractor found no timestamp.
    pub undated: usize,
    /// A timestamp outside the sane year window.
    pub out_of_range: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Valid samples only, in the order they were read.
    pub samples: Vec<MediaSample>,
    pub stats: ScanStats,
}

/// Samples the direct files of one folder for their embedded dates.
/// Read-only; recursion into subfolders is the orchestrator's job.
pub struct MetadataScanner {
    extractor: Arc<dyn DateExtractor>,
    rules: Arc<IgnoreRules>,
    sanitizer: DateSanitizer,
    sample_size: usize,
}

impl MetadataScanner {
    pub fn new(
        extractor: Arc<dyn DateExtractor>,
        rules: Arc<IgnoreRules>,
        sanitizer: DateSanitizer,
        sample_size: usize,
    ) -> Self {
        Self {
            extractor,
            rules,
            sanitizer,
            sample_size,
        }
    }

    /// Errors only when the folder itself cannot be listed. Individual files
    /// that cannot be read are counted as undated and skipped.
    pub fn scan(&self, folder: &Path) -> io::Result<ScanOutcome> {
        let mut stats = ScanStats::default();
        let capabilities = self.extractor.capabilities();
        let mut candidates: Vec<(MediaKind, PathBuf)> = Vec::new();

        for entry in fs::read_dir(folder)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping unreadable entry in {}: {}", folder.display(), err);
                    continue;
                }
            };
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let path = entry.path();
            if self.rules.ignores_file(&path) {
                stats.ignored += 1;
                continue;
            }
            let kind = match extension_of(&path).and_then(|ext| MediaKind::classify(&ext)) {
                Some(kind) => kind,
                None => {
                    stats.unsupported += 1;
                    continue;
                }
            };
            if !capabilities.supports(kind) {
                trace!("No reader for {:?}, skipping {}", kind, path.display());
                stats.capability_missing += 1;
                continue;
            }
            candidates.push((kind, path));
        }

        // Images first: they carry the most reliable dates.
        candidates.sort_by(|(ka, pa), (kb, pb)| {
            let rank = |k: &MediaKind| matches!(k, MediaKind::Video) as u8;
            rank(ka)
                .cmp(&rank(kb))
                .then_with(|| file_name(pa).cmp(&file_name(pb)))
        });
        stats.beyond_cap = candidates.len().saturating_sub(self.sample_size);
        candidates.truncate(self.sample_size);

        let mut samples = Vec::new();
        for (kind, path) in candidates {
            stats.examined += 1;
            let extraction = self.extractor.extract(&path, kind);
            let Some(timestamp) = extraction.timestamp else {
                trace!("No date in {}", path.display());
                stats.undated += 1;
                continue;
            };
            let date = timestamp.date();
            if self.sanitizer.check(Some(date)).is_none() {
                debug!("Discarding out-of-range date {} in {}", date, path.display());
                stats.out_of_range += 1;
                continue;
            }
            samples.push(MediaSample::new(path, Some(date), extraction.source, true));
        }

        debug!(
            "Scanned {}: {} samples from {} files ({} undated, {} out of range)",
            folder.display(),
            samples.len(),
            stats.examined,
            stats.undated,
            stats.out_of_range,
        );

        Ok(ScanOutcome { samples, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::extract::{Capabilities, DateSource, Extraction};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Reads the date from the file's contents (`YYYY-MM-DD`), counting calls.
    struct ContentExtractor {
        calls: AtomicUsize,
        video: bool,
    }

    impl ContentExtractor {
        fn new(video: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                video,
            }
        }
    }

    impl DateExtractor for ContentExtractor {
        fn extract(&self, path: &Path, kind: MediaKind) -> Extraction {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let timestamp = fs::read_to_string(path)
                .ok()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .and_then(|d| d.and_hms_opt(10, 0, 0));
            let source = if kind == MediaKind::Video {
                DateSource::Video
            } else {
                DateSource::Exif
            };
            Extraction { timestamp, source }
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                video: self.video,
                heic: true,
            }
        }
    }

    fn scanner(extractor: Arc<ContentExtractor>, sample_size: usize) -> MetadataScanner {
        let rules = Arc::new(IgnoreRules::from_config(&RunConfig::default()));
        MetadataScanner::new(extractor, rules, DateSanitizer::new(2026), sample_size)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_filters_and_counts() {
        let dir = tempdir().unwrap();
        let d = dir.path();
        fs::write(d.join("a.jpg"), "2026-02-08").unwrap();
        fs::write(d.join("b.JPG"), "2026-02-08").unwrap();
        fs::write(d.join("c.png"), "1999-12-31").unwrap();
        fs::write(d.join("d.jpg"), "corrupt").unwrap();
        fs::write(d.join("notes.txt"), "2026-02-08").unwrap();
        fs::write(d.join("song.mp3"), "2026-02-08").unwrap();
        fs::write(d.join("Thumbs.db"), "").unwrap();
        fs::create_dir(d.join("nested")).unwrap();
        fs::write(d.join("nested/e.jpg"), "2026-02-08").unwrap();

        let extractor = Arc::new(ContentExtractor::new(true));
        let outcome = scanner(extractor.clone(), 50).scan(d).unwrap();

        assert_eq!(outcome.samples.len(), 2);
        assert!(outcome
            .samples
            .iter()
            .all(|s| s.valid && s.extracted_date == Some(ymd(2026, 2, 8))));
        assert_eq!(outcome.stats.examined, 4);
        assert_eq!(outcome.stats.out_of_range, 1);
        assert_eq!(outcome.stats.undated, 1);
        assert_eq!(outcome.stats.ignored, 2);
        assert_eq!(outcome.stats.unsupported, 1);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_sample_cap_bounds_reads() {
        let dir = tempdir().unwrap();
        for i in 0..80 {
            fs::write(dir.path().join(format!("IMG_{:04}.jpg", i)), "2025-06-01").unwrap();
        }

        let extractor = Arc::new(ContentExtractor::new(true));
        let outcome = scanner(extractor.clone(), 50).scan(dir.path()).unwrap();

        assert_eq!(outcome.samples.len(), 50);
        assert_eq!(outcome.stats.beyond_cap, 30);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_images_sampled_before_videos() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a_clip.mp4"), "2025-01-01").unwrap();
        fs::write(dir.path().join("z_photo.jpg"), "2025-01-02").unwrap();

        let extractor = Arc::new(ContentExtractor::new(true));
        let outcome = scanner(extractor, 1).scan(dir.path()).unwrap();

        assert_eq!(outcome.samples.len(), 1);
        assert_eq!(outcome.samples[0].source, DateSource::Exif);
        assert_eq!(outcome.samples[0].extracted_date, Some(ymd(2025, 1, 2)));
    }

    #[test]
    fn test_missing_video_capability_skips_videos() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip.mov"), "2025-01-01").unwrap();
        fs::write(dir.path().join("photo.jpg"), "2025-01-01").unwrap();

        let extractor = Arc::new(ContentExtractor::new(false));
        let outcome = scanner(extractor, 50).scan(dir.path()).unwrap();

        assert_eq!(outcome.samples.len(), 1);
        assert_eq!(outcome.stats.capability_missing, 1);
    }

    #[test]
    fn test_unreadable_folder_is_error() {
        let dir = tempdir().unwrap();
        let extractor = Arc::new(ContentExtractor::new(true));
        assert!(scanner(extractor, 50).scan(&dir.path().join("gone")).is_err());
    }
}
