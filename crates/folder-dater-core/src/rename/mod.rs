pub mod executor;
pub mod resolve;

pub use executor::{RenameExecutor, RenameOutcome};
pub use resolve::ConflictResolver;
