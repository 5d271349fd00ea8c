use std::ops::Range;

use crate::normalizer::CATEGORIES;

pub fn build_extraction_prompt() -> String {
    format!(
        r#"Analyze this bank statement and extract every INCOMING transaction (deposits and credits only).

INSTRUCTIONS:
1. Identify the account number and report only its last 4 digits, or "N/A" if it is not shown
2. Group transactions by calendar month, labeled like "January 2024"
3. Classify each transaction with exactly one category from the list below
4. Ignore withdrawals, fees, debits and card purchases
5. Output ONLY valid JSON, nothing else

CATEGORIES:
{}

SCHEMA:
{{
  "accountNumber": "1234",
  "totalIncome": 0.00,
  "totalTransactions": 0,
  "months": [
    {{
      "monthKey": "January 2024",
      "total": 0.00,
      "categories": {{"ACH Deposit": {{"amount": 0.00, "count": 0}}}},
      "transactions": [
        {{"date": "2024-01-15", "type": "ACH Deposit", "source": "Payer name", "amount": 0.00, "description": "Original statement line"}}
      ]
    }}
  ]
}}

RULES:
- Dates use YYYY-MM-DD
- Amounts are positive numbers without currency symbols or thousands separators
- "source" is the payer, "description" is the statement line copied as printed
- Output ONLY the JSON object, no markdown, no explanations

JSON OUTPUT:"#,
        CATEGORIES.join(", ")
    )
}

/// Prompt for one piece of a split statement.
pub fn build_chunk_prompt(chunk_index: usize, total_chunks: usize, page_range: &Range<usize>) -> String {
    if total_chunks <= 1 {
        return build_extraction_prompt();
    }

    format!(
        r#"This file contains pages {}-{} of a longer statement (part {} of {}).
Extract only the transactions printed on these pages. A month may continue in another part; report what is visible here.

{}"#,
        page_range.start + 1,
        page_range.end,
        chunk_index + 1,
        total_chunks,
        build_extraction_prompt()
    )
}
