pub mod naming;
pub mod sanitize;
pub mod vote;

pub use naming::{compose_name, NameSanitizer, UNTITLED};
pub use sanitize::DateSanitizer;
pub use vote::{DateVoter, RejectReason, VoteOutcome, VoteResult};
