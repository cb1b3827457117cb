use chrono::{DateTime, Local, NaiveDateTime, Utc};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::VideoMetadataReader;

/// Seconds between 1904-01-01 (QuickTime epoch) and 1970-01-01.
const QUICKTIME_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Reads the movie creation time from the `moov/mvhd` box of ISO-BMFF
/// containers (mp4, mov, m4v, 3gp). Other containers yield `None`.
pub struct IsoBmffReader;

impl VideoMetadataReader for IsoBmffReader {
    fn read_creation_time(&self, path: &Path) -> Option<NaiveDateTime> {
        let mut file = File::open(path).ok()?;
        let len = file.metadata().ok()?.len();
        let moov = find_box(&mut file, 0, len, *b"moov")?;
        let mvhd = find_box(&mut file, moov.data_start, moov.data_end, *b"mvhd")?;
        read_mvhd_creation_time(&mut file, mvhd)
    }
}

#[derive(Debug, Clone, Copy)]
struct BoxRange {
    data_start: u64,
    data_end: u64,
}

fn find_box(file: &mut File, start: u64, end: u64, kind: [u8; 4]) -> Option<BoxRange> {
    let mut offset = start;
    while offset + 8 <= end {
        file.seek(SeekFrom::Start(offset)).ok()?;
        let mut header = [0u8; 8];
        file.read_exact(&mut header).ok()?;
        let mut size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let box_kind = [header[4], header[5], header[6], header[7]];
        let mut header_size = 8u64;

        if size == 1 {
            size = read_u64(file)?;
            header_size = 16;
        } else if size == 0 {
            // Box extends to the end of its parent.
            size = end - offset;
        }
        if size < header_size {
            return None;
        }
        let box_end = offset.saturating_add(size).min(end);

        if box_kind == kind {
            return Some(BoxRange {
                data_start: offset + header_size,
                data_end: box_end,
            });
        }
        offset = box_end;
    }
    None
}

fn read_mvhd_creation_time(file: &mut File, mvhd: BoxRange) -> Option<NaiveDateTime> {
    file.seek(SeekFrom::Start(mvhd.data_start)).ok()?;
    let mut version_flags = [0u8; 4];
    file.read_exact(&mut version_flags).ok()?;
    let seconds = if version_flags[0] == 1 {
        read_u64(file)?
    } else {
        read_u32(file)? as u64
    };
    if seconds == 0 {
        return None;
    }
    let unix = i64::try_from(seconds).ok()? - QUICKTIME_EPOCH_OFFSET;
    let utc = DateTime::<Utc>::from_timestamp(unix, 0)?;
    Some(utc.with_timezone(&Local).naive_local())
}

fn read_u32(file: &mut File) -> Option<u32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf).ok()?;
    Some(u32::from_be_bytes(buf))
}

fn read_u64(file: &mut File) -> Option<u64> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf).ok()?;
    Some(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::fs;
    use tempfile::tempdir;

    fn boxed(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out
    }

    fn mp4_created_at(quicktime_seconds: u32) -> Vec<u8> {
        let mut mvhd = vec![0u8; 100];
        mvhd[4..8].copy_from_slice(&quicktime_seconds.to_be_bytes());

        let mut file = boxed(b"ftyp", b"isom\x00\x00\x02\x00isomiso2");
        file.extend(boxed(b"free", &[0u8; 16]));
        file.extend(boxed(b"moov", &boxed(b"mvhd", &mvhd)));
        file
    }

    #[test]
    fn test_reads_mvhd_creation_time() {
        let naive = NaiveDate::from_ymd_opt(2026, 2, 8)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let utc = Utc.from_utc_datetime(&naive);
        let seconds = (utc.timestamp() + QUICKTIME_EPOCH_OFFSET) as u32;

        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        fs::write(&path, mp4_created_at(seconds)).unwrap();

        let read = IsoBmffReader.read_creation_time(&path).unwrap();
        assert_eq!(read, utc.with_timezone(&Local).naive_local());
    }

    #[test]
    fn test_zero_creation_time_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        fs::write(&path, mp4_created_at(0)).unwrap();
        assert_eq!(IsoBmffReader.read_creation_time(&path), None);
    }

    #[test]
    fn test_non_bmff_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.avi");
        fs::write(&path, b"RIFF\x00\x00\x00\x00AVI LIST").unwrap();
        assert_eq!(IsoBmffReader.read_creation_time(&path), None);
    }
}
