use regex::Regex;
use std::sync::LazyLock;

pub const OTHER: &str = "Other";

/// The closed, wire-visible category label set.
pub const CATEGORIES: [&str; 12] = [
    "ACH Deposit",
    "Wire Transfer",
    "Zelle Transfer",
    "Venmo",
    "Cash App",
    "PayPal",
    "Bank Deposit",
    "Check Deposit",
    "Mobile Deposit",
    "Direct Deposit",
    "Transfer In",
    OTHER,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    /// Lower-case substring matched against the lower-cased label
    pub pattern: &'static str,
    pub label: &'static str,
}

const fn rule(pattern: &'static str, label: &'static str) -> CategoryRule {
    CategoryRule { pattern, label }
}

/// Evaluated top to bottom; the first matching pattern wins.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    rule("transfer in", "Transfer In"),
    rule("zelle", "Zelle Transfer"),
    rule("bank deposit", "Bank Deposit"),
    rule("atm", "Bank Deposit"),
    rule("check", "Check Deposit"),
    rule("mobile", "Mobile Deposit"),
    rule("direct deposit", "Direct Deposit"),
    rule("ach", "ACH Deposit"),
    rule("wire", "Wire Transfer"),
    rule("venmo", "Venmo"),
    rule("cash app", "Cash App"),
    rule("paypal", "PayPal"),
];

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{Alphabetic}\p{N}\s]").expect("valid punctuation regex")
});

pub struct CategoryNormalizer {
    rules: Vec<CategoryRule>,
}

impl Default for CategoryNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryNormalizer {
    pub fn new() -> Self {
        Self::with_rules(CATEGORY_RULES.to_vec())
    }

    pub fn with_rules(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// Map a free-text label onto the taxonomy. Unknown labels pass through untouched.
    pub fn normalize(&self, label: &str) -> String {
        let lowered = label.trim().to_lowercase();

        if let Some(canonical) = CATEGORIES
            .iter()
            .find(|c| c.to_lowercase() == lowered)
        {
            return canonical.to_string();
        }

        self.rules
            .iter()
            .find(|r| lowered.contains(r.pattern))
            .map(|r| r.label.to_string())
            .unwrap_or_else(|| label.to_string())
    }
}

/// Comparison form of a description: lowercase, single spaces, no punctuation.
///
/// Only used for identity, never for display.
pub fn normalize_description(description: &str) -> String {
    let lowered = description.to_lowercase();
    let collapsed = WHITESPACE.replace_all(&lowered, " ");
    let stripped = NON_ALPHANUMERIC.replace_all(&collapsed, "");
    stripped.trim().to_string()
}

pub fn is_canonical(label: &str) -> bool {
    CATEGORIES.contains(&label)
}
