// Reusable field definitions, referenced from data models by name.

use super::models::{FieldDef, FieldFormat};
use crate::contract::normalize::{map_of, null_if, Fields, FromRaw, Section};
use crate::contract::{SectionData, SectionKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type Definitions = BTreeMap<String, Definition>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    #[serde(rename = "type", default)]
    pub definition_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pii: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldDef>,
}

impl FromRaw for Definition {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            definition_type: f.string("type"),
            title: f.opt_string("title"),
            description: f.opt_string("description"),
            enum_values: f.string_list("enum"),
            format: f.closed("format"),
            precision: f.opt_i64("precision"),
            scale: f.opt_i64("scale"),
            min_length: f.opt_i64_any(&["minLength", "min_length"]),
            max_length: f.opt_i64_any(&["maxLength", "max_length"]),
            pattern: f.opt_string("pattern"),
            minimum: f.opt_f64("minimum"),
            maximum: f.opt_f64("maximum"),
            examples: f.values("examples"),
            pii: f.opt_bool("pii"),
            classification: f.opt_string("classification"),
            tags: f.string_list("tags"),
            fields: f.map("fields"),
        }
    }
}

impl FromRaw for Definitions {
    fn from_raw(raw: &Value) -> Self {
        map_of(raw)
    }
}

impl Section for Definitions {
    const KIND: SectionKind = SectionKind::Definitions;

    fn into_data(self) -> SectionData {
        SectionData::Definitions(self)
    }

    fn validate(&mut self) -> Vec<String> {
        let mut issues = Vec::new();
        for (name, definition) in self.iter_mut() {
            let label = |what: &str| format!("{}.{}", name, what);
            null_if(&mut definition.precision, |p| *p <= 0, &mut issues, &label("precision"));
            null_if(&mut definition.scale, |s| *s < 0, &mut issues, &label("scale"));
            if let (Some(precision), Some(scale)) = (definition.precision, definition.scale) {
                if scale > precision {
                    issues.push(format!("{}: scale {} exceeds precision {}", name, scale, precision));
                    definition.scale = None;
                }
            }
            null_if(
                &mut definition.pattern,
                |p| Regex::new(p).is_err(),
                &mut issues,
                &label("pattern"),
            );
            for (field_name, field) in definition.fields.iter_mut() {
                issues.extend(field.validate_at(&format!("{}.{}", name, field_name)));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::normalize;
    use serde_json::json;

    #[test]
    fn test_definitions_normalize() {
        let definitions: Definitions = normalize(&json!({
            "order_id": {"type": "string", "format": "uuid", "pii": false, "examples": "a-b-c"},
            "amount": {"type": "decimal", "precision": "10", "scale": 2}
        }));
        let order = &definitions["order_id"];
        assert_eq!(order.format, Some(FieldFormat::Uuid));
        assert_eq!(order.examples, Some(vec![json!("a-b-c")]));
        assert_eq!(definitions["amount"].precision, Some(10));
    }

    #[test]
    fn test_scale_beyond_precision_is_nulled() {
        let definitions: Definitions = normalize(&json!({
            "amount": {"type": "decimal", "precision": 4, "scale": 6}
        }));
        assert_eq!(definitions["amount"].precision, Some(4));
        assert_eq!(definitions["amount"].scale, None);
    }
}
