use chrono::NaiveDate;
use extract::{AnalysisResult, CategoryNormalizer, MonthBucket, NO_ACCOUNT, PartialResult};
use indexmap::IndexMap;
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::dedup::{DedupKey, DeduplicationKeyBuilder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub partials: usize,
    pub months: usize,
    pub transactions_seen: usize,
    pub transactions_kept: usize,
    pub duplicates_dropped: usize,
}

/// A month under construction, with the identity keys it already holds.
struct MonthState {
    bucket: MonthBucket,
    seen: HashSet<DedupKey>,
}

impl MonthState {
    fn new(month_key: &str) -> Self {
        Self {
            bucket: MonthBucket::new(month_key),
            seen: HashSet::new(),
        }
    }
}

pub struct ResultMerger {
    normalizer: CategoryNormalizer,
    keys: DeduplicationKeyBuilder,
}

impl Default for ResultMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultMerger {
    pub fn new() -> Self {
        Self::with_normalizer(CategoryNormalizer::new())
    }

    pub fn with_normalizer(normalizer: CategoryNormalizer) -> Self {
        Self {
            normalizer,
            keys: DeduplicationKeyBuilder::new(),
        }
    }

    /// Combine partial results, in chunk order, into one consistent report.
    pub fn merge(&self, partials: Vec<PartialResult>) -> AnalysisResult {
        self.merge_with_stats(partials).0
    }

    pub fn merge_with_stats(&self, partials: Vec<PartialResult>) -> (AnalysisResult, MergeStats) {
        let mut stats = MergeStats {
            partials: partials.len(),
            ..MergeStats::default()
        };
        let mut account_number: Option<String> = None;
        let mut months: IndexMap<String, MonthState> = IndexMap::new();

        for partial in partials {
            if account_number.is_none() && partial.has_account_number() {
                account_number = Some(partial.account_number.trim().to_string());
            }

            for bucket in partial.months {
                self.fold_month(&mut months, bucket, &mut stats);
            }
        }

        let mut buckets: Vec<MonthBucket> = months
            .into_values()
            .map(|state| {
                let mut bucket = state.bucket;
                bucket.recompute();
                bucket
            })
            .collect();
        sort_months_descending(&mut buckets);

        stats.months = buckets.len();
        stats.transactions_kept = buckets.iter().map(|b| b.transactions.len()).sum();

        let result = AnalysisResult {
            account_number: account_number.unwrap_or_else(|| NO_ACCOUNT.to_string()),
            total_income: buckets.iter().fold(0.0, |sum, b| sum + b.total),
            total_transactions: stats.transactions_kept,
            months: buckets,
        };

        info!(
            partials = stats.partials,
            months = stats.months,
            transactions = stats.transactions_kept,
            duplicates = stats.duplicates_dropped,
            "Merged partial results"
        );

        (result, stats)
    }

    fn fold_month(
        &self,
        months: &mut IndexMap<String, MonthState>,
        bucket: MonthBucket,
        stats: &mut MergeStats,
    ) {
        let month_key = bucket.month_key.trim().to_string();
        let is_new = !months.contains_key(&month_key);
        let state = months
            .entry(month_key.clone())
            .or_insert_with(|| MonthState::new(&month_key));

        let mut appended = 0;
        for mut transaction in bucket.transactions {
            stats.transactions_seen += 1;
            transaction.category = self.normalizer.normalize(&transaction.category);

            // First report of an event wins, including its category
            let key = self.keys.key(&transaction);
            if state.seen.insert(key) {
                state.bucket.push(transaction);
                appended += 1;
            } else {
                stats.duplicates_dropped += 1;
            }
        }

        debug!(month = %month_key, is_new, appended, "Folded month");
    }
}

/// Interpret a month label such as `January 2024`, `Jan 2024`, `2024-01` or `01/2024`.
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    let label = label.trim();

    NaiveDate::parse_from_str(&format!("1 {}", label), "%d %B %Y")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", label), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("01/{}", label), "%d/%m/%Y"))
        .ok()
}

/// Newest month first; labels that are not dates keep their order at the end.
pub fn sort_months_descending(buckets: &mut [MonthBucket]) {
    buckets.sort_by_cached_key(|bucket| {
        let parsed = parse_month_label(&bucket.month_key);
        (parsed.is_none(), Reverse(parsed))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::Transaction;

    fn txn(date: &str, amount: f64, description: &str, category: &str) -> Transaction {
        Transaction {
            date: date.to_string(),
            category: category.to_string(),
            source: "Payer".to_string(),
            amount,
            description: description.to_string(),
        }
    }

    fn month(key: &str, transactions: Vec<Transaction>) -> MonthBucket {
        MonthBucket {
            month_key: key.to_string(),
            total: 0.0,
            categories: Default::default(),
            transactions,
        }
    }

    fn partial(account: &str, months: Vec<MonthBucket>) -> PartialResult {
        PartialResult {
            account_number: account.to_string(),
            months,
            ..PartialResult::default()
        }
    }

    #[test]
    fn test_empty_merge() {
        let result = ResultMerger::new().merge(Vec::new());
        assert_eq!(result, AnalysisResult::default());
    }

    #[test]
    fn test_account_number_first_real_value() {
        let merger = ResultMerger::new();
        let result = merger.merge(vec![
            partial("N/A", vec![]),
            partial(" 4821 ", vec![]),
            partial("1111", vec![]),
        ]);
        assert_eq!(result.account_number, "4821");

        let result = merger.merge(vec![partial("N/A", vec![]), partial("", vec![])]);
        assert_eq!(result.account_number, "N/A");
    }

    #[test]
    fn test_cross_chunk_duplicate_collapsed() {
        let merger = ResultMerger::new();
        let result = merger.merge(vec![
            partial(
                "4821",
                vec![month(
                    "January 2024",
                    vec![txn("2024-01-15", 1000.0, "ACH DEPOSIT PPD HYCITE", "ach deposit")],
                )],
            ),
            partial(
                "4821",
                vec![month(
                    "January 2024",
                    vec![
                        txn("2024-01-15", 1000.0, "ach deposit ppd hycite!!", "ACH Deposit"),
                        txn("2024-01-28", 250.0, "ZELLE FROM J DOE", "zelle"),
                    ],
                )],
            ),
        ]);

        assert_eq!(result.months.len(), 1);
        let january = &result.months[0];
        assert_eq!(january.transactions.len(), 2);
        assert_eq!(january.transactions[0].category, "ACH Deposit");
        assert_eq!(january.total, 1250.0);
        assert_eq!(january.categories["ACH Deposit"].count, 1);
        assert_eq!(january.categories["Zelle Transfer"].amount, 250.0);
        assert_eq!(result.total_income, 1250.0);
        assert_eq!(result.total_transactions, 2);
    }

    #[test]
    fn test_first_seen_category_wins() {
        let merger = ResultMerger::new();
        let result = merger.merge(vec![
            partial("N/A", vec![month("May 2024", vec![txn("2024-05-02", 80.0, "TRANSFER", "Venmo")])]),
            partial("N/A", vec![month("May 2024", vec![txn("2024-05-02", 80.0, "transfer", "Cash App")])]),
        ]);

        let may = &result.months[0];
        assert_eq!(may.transactions.len(), 1);
        assert_eq!(may.transactions[0].category, "Venmo");
        assert!(!may.categories.contains_key("Cash App"));
    }

    #[test]
    fn test_reported_totals_are_ignored() {
        let mut reported = month("June 2024", vec![txn("2024-06-01", 10.0, "A", "Other")]);
        reported.total = 5000.0;
        let mut repeated = reported.clone();
        repeated.total = 5000.0;

        let (result, stats) = ResultMerger::new()
            .merge_with_stats(vec![partial("N/A", vec![reported]), partial("N/A", vec![repeated])]);

        assert_eq!(result.months[0].total, 10.0);
        assert_eq!(result.total_income, 10.0);
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(stats.transactions_seen, 2);
    }

    #[test]
    fn test_months_sorted_descending() {
        let result = ResultMerger::new().merge(vec![
            partial("N/A", vec![month("March 2024", vec![]), month("January 2024", vec![])]),
            partial("N/A", vec![month("February 2024", vec![]), month("December 2023", vec![])]),
        ]);

        let keys: Vec<&str> = result.months.iter().map(|m| m.month_key.as_str()).collect();
        assert_eq!(keys, vec!["March 2024", "February 2024", "January 2024", "December 2023"]);
    }

    #[test]
    fn test_unparseable_months_sort_last() {
        let mut buckets = vec![
            month("Statement period", vec![]),
            month("2024-02", vec![]),
            month("Unknown", vec![]),
            month("Mar 2024", vec![]),
        ];
        sort_months_descending(&mut buckets);

        let keys: Vec<&str> = buckets.iter().map(|m| m.month_key.as_str()).collect();
        assert_eq!(keys, vec!["Mar 2024", "2024-02", "Statement period", "Unknown"]);
    }

    #[test]
    fn test_parse_month_label() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(parse_month_label("January 2024"), jan);
        assert_eq!(parse_month_label("Jan 2024"), jan);
        assert_eq!(parse_month_label("2024-01"), jan);
        assert_eq!(parse_month_label("01/2024"), jan);
        assert_eq!(parse_month_label("Q1 2024"), None);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let merger = ResultMerger::new();
        let once = merger.merge(vec![
            partial("4821", vec![month("April 2024", vec![
                txn("2024-04-01", 12.5, "MOBILE DEP", "mobile"),
                txn("2024-04-03", 99.99, "Interest", "Interest Payment"),
            ])]),
            partial("N/A", vec![month("March 2024", vec![txn("2024-03-30", 7.0, "WIRE", "wire")])]),
        ]);

        let twice = merger.merge(vec![once.clone()]);
        assert_eq!(once, twice);
    }
}
