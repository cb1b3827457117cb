use chrono::{Datelike, Local, NaiveDate};

pub const MIN_YEAR: i32 = 2000;

/// Accepts dates from `MIN_YEAR` through next year. Anything outside that
/// window is almost always a dead camera battery or an epoch default.
#[derive(Debug, Clone, Copy)]
pub struct DateSanitizer {
    max_year: i32,
}

impl DateSanitizer {
    pub fn new(current_year: i32) -> Self {
        Self {
            max_year: current_year + 1,
        }
    }

    pub fn for_today() -> Self {
        Self::new(Local::now().year())
    }

    pub fn is_valid(&self, date: NaiveDate) -> bool {
        (MIN_YEAR..=self.max_year).contains(&date.year())
    }

    pub fn check(&self, date: Option<NaiveDate>) -> Option<NaiveDate> {
        date.filter(|d| self.is_valid(*d))
    }
}
