use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

use super::{HeicImageReader, ImageMetadataReader};

/// EXIF reader for JPEG, TIFF, PNG, WebP and HEIF containers.
/// Prefers `DateTimeOriginal`, falls back to `DateTime`.
pub struct ExifReader;

impl ExifReader {
    fn read(path: &Path) -> Option<NaiveDateTime> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        let exif = match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(e) => {
                trace!("No EXIF in {}: {}", path.display(), e);
                return None;
            }
        };
        let field = exif
            .get_field(Tag::DateTimeOriginal, In::PRIMARY)
            .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))?;

        // display_value() quotes ASCII values, so read the raw bytes.
        let raw = match &field.value {
            Value::Ascii(values) if !values.is_empty() => {
                String::from_utf8_lossy(&values[0]).into_owned()
            }
            _ => field.display_value().to_string(),
        };
        parse_exif_timestamp(&raw)
    }
}

impl ImageMetadataReader for ExifReader {
    fn read_timestamp(&self, path: &Path) -> Option<NaiveDateTime> {
        Self::read(path)
    }
}

impl HeicImageReader for ExifReader {
    fn read_heic_timestamp(&self, path: &Path) -> Option<NaiveDateTime> {
        Self::read(path)
    }
}

/// Lenient parse of `YYYY:MM:DD HH:MM:SS` and its common variants
/// (`-` date separators, `T` separator, trailing zone). A missing or
/// malformed time of day becomes midnight; only the day is voted on.
pub fn parse_exif_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let cleaned = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\0')
        .replace('T', " ");
    let mut parts = cleaned.split_whitespace();

    let date_part = parts.next()?.replace('-', ":");
    let date = NaiveDate::parse_from_str(&date_part, "%Y:%m:%d").ok()?;

    let time = parts
        .next()
        .and_then(|t| t.get(..8))
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M:%S").ok());

    match time {
        Some(time) => Some(date.and_time(time)),
        None => date.and_hms_opt(0, 0, 0),
    }
}
