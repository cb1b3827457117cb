use std::path::{Path, PathBuf};
use tracing::{error, trace};
use walkdir::WalkDir;

use super::IgnoreRules;

/// A directory below the target root, in post-order position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub path: PathBuf,
    /// 1 for direct children of the root.
    pub depth: usize,
}

/// Enumerates every directory below `root` once, before anything is renamed,
/// and returns them in post-order: each folder appears after all of its
/// descendants. Ignored directories are pruned with their whole subtree.
/// Symlinked directories are not followed and not listed. The root itself
/// is never part of the list.
pub fn build_folder_list(
    root: &Path,
    rules: &IgnoreRules,
    max_depth: Option<usize>,
) -> Vec<FolderEntry> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth.unwrap_or(usize::MAX))
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !e.file_type().is_dir() || !rules.ignores_dir(e.path()));

    // `contents_first` would make `filter_entry` a plain filter that still
    // descends into ignored trees, so post-order is rebuilt from pre-order.
    let mut post_order = Vec::new();
    let mut open: Vec<FolderEntry> = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                error!("Skipping unreadable entry under {}: {}", root.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let depth = entry.depth();
        while open.last().map_or(false, |top| top.depth >= depth) {
            if let Some(done) = open.pop() {
                post_order.push(done);
            }
        }
        trace!("Found folder {}", entry.path().display());
        open.push(FolderEntry {
            path: entry.into_path(),
            depth,
        });
    }

    while let Some(done) = open.pop() {
        post_order.push(done);
    }

    post_order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use std::fs;
    use tempfile::tempdir;

    fn names(root: &Path, list: &[FolderEntry]) -> Vec<String> {
        list.iter()
            .map(|f| {
                f.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_post_order_children_first() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        for dir in ["a/a1/a1x", "a/a2", "b", "c/c1"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("a/file.jpg"), b"x").unwrap();

        let rules = IgnoreRules::from_config(&RunConfig::default());
        let list = build_folder_list(root, &rules, None);
        assert_eq!(
            names(root, &list),
            vec!["a/a1/a1x", "a/a1", "a/a2", "a", "b", "c/c1", "c"]
        );
        assert_eq!(list[0].depth, 3);
        assert_eq!(list[3].depth, 1);
    }

    #[test]
    fn test_ignored_dirs_are_pruned() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("Trip/@eaDir/thumbs")).unwrap();
        fs::create_dir_all(root.join("#recycle/old")).unwrap();

        let rules = IgnoreRules::from_config(&RunConfig::default());
        let list = build_folder_list(root, &rules, None);
        assert_eq!(names(root, &list), vec!["Trip"]);
    }

    #[test]
    fn test_max_depth_limits_folders() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();

        let rules = IgnoreRules::from_config(&RunConfig::default());
        let list = build_folder_list(root, &rules, Some(1));
        assert_eq!(names(root, &list), vec!["a"]);
    }
}
