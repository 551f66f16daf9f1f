// Quality checks attached to models and fields.
// Tagged by `type`; tags outside the known set are kept verbatim.

use crate::contract::normalize::{Fields, FromRaw};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_be_less_than: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_be_greater_than: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_be_equal_to: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One quality rule. Deserialization goes through the normalizer, so it
/// never fails on an unexpected shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum QualityCheck {
    Sql(SqlCheck),
    Description(DescriptionCheck),
    Text(TextCheck),
    /// Unrecognized `type`, kept as received
    Unstructured(Map<String, Value>),
}

impl QualityCheck {
    pub fn type_tag(&self) -> Option<&str> {
        match self {
            QualityCheck::Sql(_) => Some("sql"),
            QualityCheck::Description(_) => Some("description"),
            QualityCheck::Text(_) => Some("text"),
            QualityCheck::Unstructured(map) => map.get("type").and_then(Value::as_str),
        }
    }
}

impl FromRaw for QualityCheck {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        let tag = f.opt_string("type").map(|t| t.trim().to_lowercase());
        match tag.as_deref() {
            Some("sql") => QualityCheck::Sql(SqlCheck {
                description: f.opt_string("description"),
                query: f.string("query"),
                expected_result: f.opt_string_any(&["expectedResult", "expected_result"]),
                dialect: f.opt_string("dialect"),
                must_be_less_than: f.opt_f64("mustBeLessThan"),
                must_be_greater_than: f.opt_f64("mustBeGreaterThan"),
                must_be_equal_to: f.opt_f64("mustBeEqualTo"),
            }),
            Some("description") => QualityCheck::Description(DescriptionCheck {
                description: f.opt_string("description"),
                required: f.opt_bool("required"),
            }),
            Some("text") => QualityCheck::Text(TextCheck {
                description: f.opt_string("description"),
            }),
            _ => {
                log::debug!("Keeping quality check with type {:?} as unstructured", tag);
                match raw {
                    Value::Object(map) => QualityCheck::Unstructured(map.clone()),
                    other => {
                        let mut map = Map::new();
                        map.insert("description".to_string(), other.clone());
                        QualityCheck::Unstructured(map)
                    }
                }
            }
        }
    }
}

impl From<Value> for QualityCheck {
    fn from(value: Value) -> Self {
        QualityCheck::from_raw(&value)
    }
}

impl From<QualityCheck> for Value {
    fn from(check: QualityCheck) -> Self {
        let (tag, body) = match check {
            QualityCheck::Sql(c) => ("sql", serde_json::to_value(c)),
            QualityCheck::Description(c) => ("description", serde_json::to_value(c)),
            QualityCheck::Text(c) => ("text", serde_json::to_value(c)),
            QualityCheck::Unstructured(map) => return Value::Object(map),
        };
        let mut map = match body {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert("type".to_string(), Value::String(tag.to_string()));
        Value::Object(map)
    }
}

/// Drop checks that cannot be evaluated; returns what was dropped
pub(crate) fn retain_valid(checks: &mut Vec<QualityCheck>, path: &str) -> Vec<String> {
    let mut issues = Vec::new();
    checks.retain(|check| match check {
        QualityCheck::Sql(sql) if sql.query.trim().is_empty() => {
            issues.push(format!("{}: sql quality check without a query", path));
            false
        }
        _ => true,
    });
    issues
}
