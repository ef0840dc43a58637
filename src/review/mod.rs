pub mod input;
pub mod output;
pub mod service;

pub use input::{Credentials, PrInput, ReviewInput, ReviewRequest, Ruleset};
pub use output::{MissingTestArea, ReviewIssue, ReviewMeta, ReviewOutput, Severity};
pub use service::ReviewService;
