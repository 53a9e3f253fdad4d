// Core algorithm exports
pub mod calendar;
pub mod filters;
pub mod interests;
pub mod ledger;
pub mod matcher;
pub mod scoring;

pub use filters::{build_criteria, matches_criteria};
pub use interests::{DailyLimits, InterestPolicy, InterestWorkflow};
pub use ledger::{MatchOptions, MatchService};
pub use matcher::{MatchResult, Matcher};
pub use scoring::{calculate_compatibility, Compatibility};
