pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod progress;
pub mod rename;
pub mod report;
pub mod scanner;

pub use config::{load_configuration, CaseMode, MissingMetadataPolicy, RunConfig, Settings};
pub use engine::{FolderJob, ManualDateProvider, RenameEngine, RunResult, RunState};
pub use error::{Error, Result};
pub use extract::{Capabilities, DateExtractor, MediaDateExtractor};
pub use progress::{ProgressReporter, SilentReporter};
pub use report::{OperationRecord, RecordStatus, RunReport, RunSummary};
