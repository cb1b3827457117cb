//! Date-extraction collaborators.
//!
//! The scanner only ever talks to [`DateExtractor`]. The concrete readers live
//! behind small capability traits so a build or test can run without, say, a
//! video reader and still vote on the images in a folder.

pub mod image;
pub mod video;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub use self::image::{parse_exif_timestamp, ExifReader};
pub use self::video::IsoBmffReader;

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".tif", ".tiff", ".webp"];
pub const HEIC_EXTENSIONS: &[&str] = &[".heic", ".heif"];
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".m4v", ".3gp", ".avi", ".mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Exif,
    Video,
    FilesystemFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Heic,
    Video,
}

impl MediaKind {
    /// `ext` is expected normalized (lowercase, leading dot).
    pub fn classify(ext: &str) -> Option<MediaKind> {
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Image)
        } else if HEIC_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Heic)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Result of asking a collaborator for a file's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extraction {
    pub timestamp: Option<NaiveDateTime>,
    pub source: DateSource,
}

/// Which optional decoders are present for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub video: bool,
    pub heic: bool,
}

impl Capabilities {
    pub fn supports(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => true,
            MediaKind::Heic => self.heic,
            MediaKind::Video => self.video,
        }
    }
}

/// Contract: never fails. Unsupported or corrupt input yields `timestamp: None`.
pub trait DateExtractor: Send + Sync {
    fn extract(&self, path: &Path, kind: MediaKind) -> Extraction;
    fn capabilities(&self) -> Capabilities;
}

pub trait ImageMetadataReader: Send + Sync {
    fn read_timestamp(&self, path: &Path) -> Option<NaiveDateTime>;
}

pub trait HeicImageReader: Send + Sync {
    fn read_heic_timestamp(&self, path: &Path) -> Option<NaiveDateTime>;
}

pub trait VideoMetadataReader: Send + Sync {
    fn read_creation_time(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// Routes each file to the reader for its kind, optionally falling back to
/// the file's modification time.
pub struct MediaDateExtractor {
    image: Box<dyn ImageMetadataReader>,
    heic: Option<Box<dyn HeicImageReader>>,
    video: Option<Box<dyn VideoMetadataReader>>,
    filesystem_fallback: bool,
}

impl MediaDateExtractor {
    pub fn new(image: Box<dyn ImageMetadataReader>) -> Self {
        Self {
            image,
            heic: None,
            video: None,
            filesystem_fallback: false,
        }
    }

    /// EXIF for images and HEIC, `moov/mvhd` for ISO-BMFF video.
    pub fn with_default_readers() -> Self {
        Self::new(Box::new(ExifReader))
            .with_heic_reader(Box::new(ExifReader))
            .with_video_reader(Box::new(IsoBmffReader))
    }

    pub fn with_heic_reader(mut self, reader: Box<dyn HeicImageReader>) -> Self {
        self.heic = Some(reader);
        self
    }

    pub fn with_video_reader(mut self, reader: Box<dyn VideoMetadataReader>) -> Self {
        self.video = Some(reader);
        self
    }

    pub fn with_filesystem_fallback(mut self, enabled: bool) -> Self {
        self.filesystem_fallback = enabled;
        self
    }
}

impl DateExtractor for MediaDateExtractor {
    fn extract(&self, path: &Path, kind: MediaKind) -> Extraction {
        let (timestamp, source) = match kind {
            MediaKind::Image => (self.image.read_timestamp(path), DateSource::Exif),
            MediaKind::Heic => (
                self.heic.as_ref().and_then(|r| r.read_heic_timestamp(path)),
                DateSource::Exif,
            ),
            MediaKind::Video => (
                self.video.as_ref().and_then(|r| r.read_creation_time(path)),
                DateSource::Video,
            ),
        };

        match timestamp {
            Some(_) => Extraction { timestamp, source },
            None if self.filesystem_fallback => Extraction {
                timestamp: modified_time(path),
                source: DateSource::FilesystemFallback,
            },
            None => Extraction { timestamp, source },
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            video: self.video.is_some(),
            heic: self.heic.is_some(),
        }
    }
}

fn modified_time(path: &Path) -> Option<NaiveDateTime> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}
