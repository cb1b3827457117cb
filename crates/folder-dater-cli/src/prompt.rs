use chrono::NaiveDate;
use folder_dater_core::ManualDateProvider;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

use crate::progress::CliReporter;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%d.%m.%Y", "%Y/%m/%d"];

/// Asks on stdin for folders that have no dated media. One prompt at a time
/// no matter how many workers are waiting.
pub struct StdinDateProvider {
    lock: Mutex<()>,
    reporter: Arc<CliReporter>,
}

impl StdinDateProvider {
    pub fn new(reporter: Arc<CliReporter>) -> Self {
        Self {
            lock: Mutex::new(()),
            reporter,
        }
    }
}

impl ManualDateProvider for StdinDateProvider {
    fn provide_date(&self, folder: &Path) -> Option<NaiveDate> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.reporter.suspend(|| match prompt_date(folder) {
            Ok(date) => date,
            Err(e) => {
                warn!("Prompt failed for {}: {}", folder.display(), e);
                None
            }
        })
    }
}

fn prompt_date(folder: &Path) -> io::Result<Option<NaiveDate>> {
    let mut input = String::new();

    loop {
        input.clear();

        print!(
            "No dated media in '{}'. Date (YYYY-MM-DD, empty to skip): ",
            folder.display()
        );
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }

        let answer = input.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        match parse_date(answer) {
            Some(date) => return Ok(Some(date)),
            None => println!("Could not read '{}' as a date.", answer),
        }
    }
}

pub fn parse_date(input: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
}
