pub mod dedup;
pub mod merger;

pub use dedup::{DedupKey, DeduplicationKeyBuilder};
pub use merger::{MergeStats, ResultMerger, parse_month_label, sort_months_descending};
