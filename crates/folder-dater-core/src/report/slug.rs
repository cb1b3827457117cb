use std::hash::Hasher as _;
use std::path::{Path, PathBuf};
use twox_hash::XxHash64;

const MAX_SLUG_CHARS: usize = 60;

/// Stable, filesystem-safe name for a run against `target`: the readable
/// part of the path plus a short hash of the whole path, so `/a/b_c` and
/// `/a_b/c` never share logs or reports.
pub fn run_slug(target: &Path) -> String {
    let full = target.to_string_lossy();

    let mut readable = String::new();
    let mut pending_sep = false;
    for c in full.chars() {
        if c.is_alphanumeric() || c == '-' {
            if pending_sep && !readable.is_empty() {
                readable.push('_');
            }
            pending_sep = false;
            readable.push(c);
        } else {
            pending_sep = true;
        }
    }
    if readable.is_empty() {
        readable.push_str("root");
    }
    let readable: String = readable
        .chars()
        .rev()
        .take(MAX_SLUG_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let mut hasher = XxHash64::with_seed(0);
    hasher.write(full.as_bytes());
    format!("{}-{:08x}", readable.trim_start_matches('_'), hasher.finish() as u32)
}

pub fn log_file_name(target: &Path) -> String {
    format!("{}.log", run_slug(target))
}

pub fn report_dir(output_dir: &Path, target: &Path) -> PathBuf {
    output_dir.join("reports").join(run_slug(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_is_readable_and_stable() {
        let slug = run_slug(Path::new("/volume1/Gambar/2025"));
        assert!(slug.starts_with("volume1_Gambar_2025-"), "{}", slug);
        assert_eq!(slug, run_slug(Path::new("/volume1/Gambar/2025")));
        assert!(slug.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn test_similar_paths_do_not_collide() {
        let a = run_slug(Path::new("/a/b_c"));
        let b = run_slug(Path::new("/a_b/c"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_root_and_long_paths() {
        assert!(run_slug(Path::new("/")).starts_with("root-"));
        let long = "/x".repeat(200);
        let slug = run_slug(Path::new(&long));
        assert!(slug.chars().count() <= MAX_SLUG_CHARS + 9);
    }

    #[test]
    fn test_artifact_locations() {
        let target = Path::new("/nas/photos");
        assert!(log_file_name(target).ends_with(".log"));
        let dir = report_dir(Path::new("out"), target);
        assert!(dir.starts_with("out/reports"));
    }
}
