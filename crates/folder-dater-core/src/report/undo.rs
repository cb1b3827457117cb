use std::path::Path;

use super::record::{OperationRecord, RecordStatus};

/// `(current, original)` pairs for every live rename, newest first, so a
/// parent renamed after its children is restored before them.
pub fn undo_moves(records: &[OperationRecord]) -> Vec<(&Path, &Path)> {
    let mut renamed: Vec<&OperationRecord> = records
        .iter()
        .filter(|r| r.status == RecordStatus::Renamed)
        .filter(|r| r.new_path.is_some())
        .collect();
    renamed.sort_by(|a, b| b.sequence.cmp(&a.sequence));
    renamed
        .into_iter()
        .filter_map(|r| Some((r.new_path.as_deref()?, r.original_path.as_path())))
        .collect()
}

/// Each move only runs while the renamed folder exists and the original name
/// is free, so a second run changes nothing.
pub fn render_bash(target: &Path, records: &[OperationRecord]) -> String {
    let moves = undo_moves(records);
    let mut script = String::new();
    script.push_str("#!/usr/bin/env bash\n");
    script.push_str(&format!("# Undo script for target: {}\n", target.display()));
    script.push_str(&format!("# Reverses {} rename(s), newest first.\n", moves.len()));
    script.push_str("set -u\n\n");
    script.push_str("undo() {\n");
    script.push_str("    if [ -e \"$1\" ] && [ ! -e \"$2\" ]; then\n");
    script.push_str("        mv -- \"$1\" \"$2\" && echo \"restored: $2\"\n");
    script.push_str("    else\n");
    script.push_str("        echo \"skipped: $1\" >&2\n");
    script.push_str("    fi\n");
    script.push_str("}\n\n");
    for (current, original) in moves {
        script.push_str(&format!(
            "undo {} {}\n",
            bash_quote(&current.to_string_lossy()),
            bash_quote(&original.to_string_lossy())
        ));
    }
    script
}

pub fn render_powershell(target: &Path, records: &[OperationRecord]) -> String {
    let moves = undo_moves(records);
    let mut script = String::new();
    script.push_str(&format!("# Undo script for target: {}\n", target.display()));
    script.push_str(&format!("# Reverses {} rename(s), newest first.\n\n", moves.len()));
    script.push_str("function Undo-Rename([string]$From, [string]$To) {\n");
    script.push_str(
        "    if ((Test-Path -LiteralPath $From) -and -not (Test-Path -LiteralPath $To)) {\n",
    );
    script.push_str("        Move-Item -LiteralPath $From -Destination $To\n");
    script.push_str("        Write-Output \"restored: $To\"\n");
    script.push_str("    } else {\n");
    script.push_str("        Write-Warning \"skipped: $From\"\n");
    script.push_str("    }\n");
    script.push_str("}\n\n");
    for (current, original) in moves {
        script.push_str(&format!(
            "Undo-Rename -From {} -To {}\n",
            powershell_quote(&current.to_string_lossy()),
            powershell_quote(&original.to_string_lossy())
        ));
    }
    script
}

fn bash_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn renamed(original: &str, new: &str, sequence: u64) -> OperationRecord {
        let mut record = OperationRecord::new(PathBuf::from(original), 1)
            .finish(RecordStatus::Renamed, None);
        record.new_path = Some(PathBuf::from(new));
        record.final_target_path = Some(PathBuf::from(new));
        record.sequence = Some(sequence);
        record
    }

    #[test]
    fn test_moves_are_newest_first_and_skip_non_renames() {
        let records = vec![
            renamed("/r/p/c", "/r/p/2026-01-01 C", 0),
            OperationRecord::new(PathBuf::from("/r/q"), 1).finish(RecordStatus::Skipped, None),
            renamed("/r/p", "/r/2026-01-02 P", 1),
        ];
        let moves = undo_moves(&records);
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0], (Path::new("/r/2026-01-02 P"), Path::new("/r/p")));
        assert_eq!(moves[1], (Path::new("/r/p/2026-01-01 C"), Path::new("/r/p/c")));
    }

    #[test]
    fn test_quoting() {
        assert_eq!(bash_quote("it's"), "'it'\\''s'");
        assert_eq!(powershell_quote("it's"), "'it''s'");
    }

    #[test]
    fn test_scripts_contain_guarded_moves() {
        let records = vec![renamed("/r/Mom's trip", "/r/2026-01-01 Mom's Trip", 0)];
        let bash = render_bash(Path::new("/r"), &records);
        assert!(bash.starts_with("#!/usr/bin/env bash"));
        assert!(bash.contains("undo '/r/2026-01-01 Mom'\\''s Trip' '/r/Mom'\\''s trip'"));

        let ps = render_powershell(Path::new("/r"), &records);
        assert!(ps.contains("Undo-Rename -From '/r/2026-01-01 Mom''s Trip' -To '/r/Mom''s trip'"));
        assert!(ps.contains("Test-Path -LiteralPath $To"));
    }
}
