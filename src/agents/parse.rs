// Contract-Drafter: Model output parsing
// Models wrap JSON in prose and fences, and answer list questions with
// bullets, quotes or brackets. These helpers dig out the usable part.

use crate::error::WorkerError;
use serde_json::Value;

/// Locate the JSON payload inside a model response
pub fn extract_json(response: &str) -> &str {
    // Fenced ```json block first
    if let Some(start) = response.find("```json") {
        let body_start = start + "```json".len();
        if let Some(len) = response[body_start..].find("```") {
            return response[body_start..body_start + len].trim();
        }
    }

    // Any fenced block, skipping its language tag
    if let Some(start) = response.find("```") {
        let after_fence = start + 3;
        let body_start = response[after_fence..]
            .find('\n')
            .map(|i| after_fence + i + 1)
            .unwrap_or(after_fence);
        if let Some(len) = response[body_start..].find("```") {
            let body = response[body_start..body_start + len].trim();
            if body.starts_with('{') || body.starts_with('[') {
                return body;
            }
        }
    }

    // Outermost braces
    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if start < end {
            return &response[start..=end];
        }
    }

    response.trim()
}

/// Parse a model response as a JSON object
pub fn parse_json_object(response: &str) -> Result<Value, WorkerError> {
    let payload = extract_json(response);
    match serde_json::from_str::<Value>(payload) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(WorkerError::InvalidJson(format!(
            "expected a JSON object, got {}",
            type_name(&other)
        ))),
        Err(e) => Err(WorkerError::InvalidJson(e.to_string())),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Split a comma/newline separated answer into clean tokens.
/// Bullets, quotes, brackets and empty entries are dropped; order is kept.
pub fn parse_list(response: &str) -> Vec<String> {
    response
        .split([',', '\n', ';'])
        .map(|token| {
            token
                .trim()
                .trim_start_matches(['-', '*', '•'])
                .trim_matches(|c: char| c.is_whitespace() || "\"'`[]{}().".contains(c))
                .to_string()
        })
        .filter(|token| !token.is_empty())
        .collect()
}
