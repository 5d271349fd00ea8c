use extract::{AnalysisResult, MonthBucket, PartialResult, Transaction};
use proptest::prelude::*;
use reconcile::{DedupKey, DeduplicationKeyBuilder, ResultMerger};
use std::collections::{BTreeMap, BTreeSet};

fn transaction() -> impl Strategy<Value = Transaction> {
    (
        prop::sample::select(vec!["2024-01-05", "2024-01-15", "2024-02-01"]),
        prop::sample::select(vec![1000u32, 2500, 12_345, 99]),
        prop::sample::select(vec![
            "ACH DEPOSIT PPD HYCITE",
            "ach deposit ppd hycite!!",
            "Zelle from J. Doe",
            "ZELLE FROM J DOE",
            "Mobile check 0042",
        ]),
        prop::sample::select(vec!["ach deposit", "ACH Deposit", "zelle", "mobile", "Interest"]),
    )
        .prop_map(|(date, cents, description, category)| Transaction {
            date: date.to_string(),
            category: category.to_string(),
            source: String::new(),
            amount: cents as f64 / 100.0,
            description: description.to_string(),
        })
}

fn month_bucket() -> impl Strategy<Value = MonthBucket> {
    (
        prop::sample::select(vec!["January 2024", "February 2024", "March 2024", "Adjustments"]),
        prop::collection::vec(transaction(), 0..6),
        0.0..5000.0f64,
    )
        .prop_map(|(key, transactions, reported_total)| MonthBucket {
            month_key: key.to_string(),
            total: reported_total,
            categories: BTreeMap::new(),
            transactions,
        })
}

fn partial() -> impl Strategy<Value = PartialResult> {
    (
        prop::sample::select(vec!["N/A", "4821", "7310"]),
        prop::collection::vec(month_bucket(), 0..4),
    )
        .prop_map(|(account, months)| PartialResult {
            account_number: account.to_string(),
            months,
            ..PartialResult::default()
        })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn keys_by_month(result: &AnalysisResult) -> BTreeMap<String, BTreeSet<DedupKey>> {
    let builder = DeduplicationKeyBuilder::new();
    result
        .months
        .iter()
        .map(|m| {
            (
                m.month_key.clone(),
                m.transactions.iter().map(|t| builder.key(t)).collect(),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn aggregates_match_transactions(partials in prop::collection::vec(partial(), 0..5)) {
        let result = ResultMerger::new().merge(partials);

        let mut income = 0.0;
        let mut count = 0;
        for month in &result.months {
            let sum: f64 = month.transactions.iter().map(|t| t.amount).sum();
            prop_assert!(close(month.total, sum));

            for (label, total) in &month.categories {
                let matching: Vec<_> = month.transactions.iter().filter(|t| &t.category == label).collect();
                prop_assert_eq!(total.count, matching.len());
                prop_assert!(close(total.amount, matching.iter().map(|t| t.amount).sum()));
            }
            let counted: usize = month.categories.values().map(|c| c.count).sum();
            prop_assert_eq!(counted, month.transactions.len());

            income += month.total;
            count += month.transactions.len();
        }

        prop_assert!(close(result.total_income, income));
        prop_assert_eq!(result.total_transactions, count);
    }

    #[test]
    fn each_key_kept_once(partials in prop::collection::vec(partial(), 0..5)) {
        let result = ResultMerger::new().merge(partials);
        let builder = DeduplicationKeyBuilder::new();

        for month in &result.months {
            let keys: BTreeSet<DedupKey> = month.transactions.iter().map(|t| builder.key(t)).collect();
            prop_assert_eq!(keys.len(), month.transactions.len());
        }
    }

    #[test]
    fn merge_is_idempotent(partials in prop::collection::vec(partial(), 0..5)) {
        let merger = ResultMerger::new();
        let once = merger.merge(partials);
        let twice = merger.merge(vec![once.clone()]);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn transaction_sets_ignore_fold_order(partials in prop::collection::vec(partial(), 0..5)) {
        let merger = ResultMerger::new();
        let forward = merger.merge(partials.clone());
        let reversed = merger.merge(partials.into_iter().rev().collect());

        prop_assert_eq!(keys_by_month(&forward), keys_by_month(&reversed));
    }
}
