use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const NO_ACCOUNT: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub date: String,
    #[serde(rename = "type", default)]
    pub category: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    #[serde(alias = "month")]
    pub month_key: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub total: f64,
    #[serde(default, deserialize_with = "deserialize_categories")]
    pub categories: BTreeMap<String, CategoryTotal>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl MonthBucket {
    pub fn new(month_key: impl Into<String>) -> Self {
        Self {
            month_key: month_key.into(),
            total: 0.0,
            categories: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }

    /// Append a transaction and fold it into the running aggregates.
    pub fn push(&mut self, transaction: Transaction) {
        self.total += transaction.amount;
        let entry = self
            .categories
            .entry(transaction.category.clone())
            .or_default();
        entry.amount += transaction.amount;
        entry.count += 1;
        self.transactions.push(transaction);
    }

    /// Rebuild `total` and `categories` from the transaction list alone.
    pub fn recompute(&mut self) {
        self.total = 0.0;
        self.categories.clear();

        for transaction in &self.transactions {
            self.total += transaction.amount;
            let entry = self
                .categories
                .entry(transaction.category.clone())
                .or_default();
            entry.amount += transaction.amount;
            entry.count += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default = "default_account_number", deserialize_with = "deserialize_account_number")]
    pub account_number: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub total_income: f64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total_transactions: usize,
    #[serde(default)]
    pub months: Vec<MonthBucket>,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            account_number: default_account_number(),
            total_income: 0.0,
            total_transactions: 0,
            months: Vec::new(),
        }
    }
}

impl AnalysisResult {
    pub fn has_account_number(&self) -> bool {
        let account = self.account_number.trim();
        !account.is_empty() && account != NO_ACCOUNT
    }
}

/// One chunk's raw, untrusted extraction output.
pub type PartialResult = AnalysisResult;

fn default_account_number() -> String {
    NO_ACCOUNT.to_string()
}

/// Accepts `1234`, `"1234"` or `null`.
fn deserialize_account_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => default_account_number(),
    })
}

/// Accepts numbers and numeric strings such as `"1,000.00"` or `"$25"`.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_amount(&s).unwrap_or(0.0),
        _ => 0.0,
    })
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().unwrap_or(0) as usize,
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Category maps are recomputed during merge, so a mangled one is dropped.
fn deserialize_categories<'de, D>(deserializer: D) -> Result<BTreeMap<String, CategoryTotal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    cleaned.parse().ok()
}
