use serde_json::Value;
use tracing::warn;

use crate::error::ExtractError;
use crate::schema::{AnalysisResult, MonthBucket, PartialResult};

/// Strip a surrounding ```json ... ``` (or bare ```) fence, if any.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the language tag on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches("json"),
    };

    body.trim_end().trim_end_matches("```").trim()
}

/// Decode one chunk's response body into a partial result.
///
/// Invalid JSON is an error. Valid JSON of the wrong shape is an empty
/// contribution, and months that fail to decode are skipped individually.
pub fn decode_partial_result(response: &str) -> Result<PartialResult, ExtractError> {
    let value: Value =
        serde_json::from_str(strip_code_fence(response)).map_err(ExtractError::InvalidJson)?;

    let Value::Object(mut object) = value else {
        warn!("Response JSON is not an object, treating as empty");
        return Ok(PartialResult::default());
    };

    let months = match object.remove("months") {
        Some(Value::Array(months)) => months,
        Some(other) => {
            warn!(found = %type_name(&other), "Response `months` is not an array, treating as empty");
            Vec::new()
        }
        None => {
            warn!("Response has no `months` field, treating as empty");
            Vec::new()
        }
    };

    let mut result: AnalysisResult =
        serde_json::from_value(Value::Object(object)).unwrap_or_else(|e| {
            warn!(error = %e, "Response header fields malformed, using defaults");
            AnalysisResult::default()
        });

    for (position, month) in months.into_iter().enumerate() {
        match serde_json::from_value::<MonthBucket>(month) {
            Ok(bucket) => result.months.push(bucket),
            Err(e) => warn!(position, error = %e, "Skipping malformed month"),
        }
    }

    Ok(result)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
