use extract::{Transaction, normalize_description};
use serde::Serialize;
use std::fmt;

/// Identity of a real-world transaction: `date|amount@2dp|normalized description`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeduplicationKeyBuilder;

impl DeduplicationKeyBuilder {
    pub fn new() -> Self {
        Self
    }

    /// The category label is deliberately not part of the key.
    pub fn key(&self, transaction: &Transaction) -> DedupKey {
        DedupKey(format!(
            "{}|{:.2}|{}",
            transaction.date.trim(),
            transaction.amount,
            normalize_description(&transaction.description)
        ))
    }
}
