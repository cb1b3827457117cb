use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::CaseMode;

pub const UNTITLED: &str = "Untitled";

lazy_static! {
    /// Runs of digit groups, each followed by a separator or the end:
    /// `2026-02-08 `, `08.02.2026 `, `2.8.26 `, `001_`.
    static ref LEADING_DATE_TOKENS: Regex =
        Regex::new(r"^(?:\d+(?:[\s._\-/,]+|$))+").unwrap();
    static ref LEADING_SEPARATORS: Regex = Regex::new(r"^[\s._\-/,]+").unwrap();
    static ref INVALID_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Cleans legacy folder names down to their descriptive part.
#[derive(Debug, Clone, Copy)]
pub struct NameSanitizer {
    case_mode: CaseMode,
}

impl NameSanitizer {
    pub fn new(case_mode: CaseMode) -> Self {
        Self { case_mode }
    }

    /// Strips date and number prefixes, invalid characters and stray
    /// separators, then applies the case policy. Never returns an empty name.
    pub fn clean(&self, original: &str) -> String {
        let mut name = INVALID_CHARS.replace_all(original, "").into_owned();

        loop {
            let stripped = LEADING_DATE_TOKENS.replace(&name, "");
            let stripped = LEADING_SEPARATORS.replace(&stripped, "").into_owned();
            if stripped == name {
                break;
            }
            name = stripped;
        }

        let collapsed = WHITESPACE.replace_all(name.trim(), " ");
        let base = if collapsed.is_empty() {
            UNTITLED
        } else {
            collapsed.as_ref()
        };
        apply_case(base, self.case_mode)
    }
}

pub fn compose_name(date: NaiveDate, cleaned: &str) -> String {
    format!("{} {}", date.format("%Y-%m-%d"), cleaned)
}

fn apply_case(name: &str, mode: CaseMode) -> String {
    match mode {
        CaseMode::Upper => name.to_uppercase(),
        CaseMode::Lower => name.to_lowercase(),
        CaseMode::Title => name
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        CaseMode::Sentence => capitalize(name),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    // A first letter that uppercases to several chars (`ß` -> `SS`) is kept.
    let mut upper = first.to_uppercase();
    let head = match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => first,
    };
    std::iter::once(head)
        .chain(chars.flat_map(char::to_lowercase))
        .collect()
}
