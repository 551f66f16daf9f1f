// Data models: named tables/views, each a tree of field definitions.
// Nesting is unbounded; every nested map is owned by its parent field.

use super::quality::{retain_valid, QualityCheck};
use crate::contract::normalize::{map_of, null_if, Fields, FromRaw, Section};
use crate::contract::{SectionData, SectionKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

pub type DataModels = BTreeMap<String, ModelDef>;

/// String formats a field may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    Email,
    Uri,
    Uuid,
}

impl FromStr for FieldFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(FieldFormat::Email),
            "uri" | "url" => Ok(FieldFormat::Uri),
            "uuid" => Ok(FieldFormat::Uuid),
            _ => Err(format!("unknown format '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldDef>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quality: Vec<QualityCheck>,
}

impl FieldDef {
    pub fn new(field_type: &str, description: &str) -> Self {
        Self {
            field_type: field_type.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    /// Nesting depth below this field (0 for a leaf)
    pub fn depth(&self) -> usize {
        let nested = self.fields.values().map(|f| f.depth() + 1).max().unwrap_or(0);
        let items = self.items.as_ref().map(|i| i.depth() + 1).unwrap_or(0);
        nested.max(items)
    }

    /// This field or any nested field declares a quality check
    pub fn has_quality(&self) -> bool {
        !self.quality.is_empty()
            || self.fields.values().any(FieldDef::has_quality)
            || self.items.as_ref().is_some_and(|i| i.has_quality())
    }

    pub(crate) fn validate_at(&mut self, path: &str) -> Vec<String> {
        let mut issues = Vec::new();
        let label = |what: &str| format!("{}.{}", path, what);

        null_if(&mut self.min_length, |n| *n < 0, &mut issues, &label("minLength"));
        null_if(&mut self.max_length, |n| *n < 0, &mut issues, &label("maxLength"));
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                issues.push(format!("{}: minLength {} exceeds maxLength {}", path, min, max));
                self.min_length = None;
                self.max_length = None;
            }
        }
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                issues.push(format!("{}: minimum {} exceeds maximum {}", path, min, max));
                self.minimum = None;
                self.maximum = None;
            }
        }
        null_if(&mut self.pattern, |p| Regex::new(p).is_err(), &mut issues, &label("pattern"));

        issues.extend(retain_valid(&mut self.quality, path));
        for (name, nested) in self.fields.iter_mut() {
            issues.extend(nested.validate_at(&format!("{}.{}", path, name)));
        }
        if let Some(items) = self.items.as_mut() {
            issues.extend(items.validate_at(&label("items")));
        }
        issues
    }
}

impl FromRaw for FieldDef {
    fn from_raw(raw: &Value) -> Self {
        // `"age": "integer"` shorthand
        if let Value::String(field_type) = raw {
            return FieldDef::new(field_type, "");
        }
        let f = Fields::of(raw);
        Self {
            field_type: f.string("type"),
            description: f.string("description"),
            title: f.opt_string("title"),
            enum_values: f.string_list("enum"),
            required: f.opt_bool("required"),
            primary_key: f.opt_bool_any(&["primaryKey", "primary_key", "primary"]),
            references: f.opt_string("references"),
            unique: f.opt_bool("unique"),
            format: f.closed("format"),
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
            items: f.boxed("items"),
            quality: f.list("quality"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDef {
    #[serde(rename = "type", default)]
    pub model_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quality: Vec<QualityCheck>,
}

impl ModelDef {
    pub fn has_quality(&self) -> bool {
        !self.quality.is_empty() || self.fields.values().any(FieldDef::has_quality)
    }
}

impl FromRaw for ModelDef {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            model_type: f.string("type"),
            description: f.string("description"),
            title: f.opt_string("title"),
            fields: f.map("fields"),
            quality: f.list("quality"),
        }
    }
}

impl FromRaw for DataModels {
    fn from_raw(raw: &Value) -> Self {
        map_of(raw)
    }
}

impl Section for DataModels {
    const KIND: SectionKind = SectionKind::DataModels;

    fn into_data(self) -> SectionData {
        SectionData::DataModels(self)
    }

    fn validate(&mut self) -> Vec<String> {
        let mut issues = Vec::new();
        for (name, model) in self.iter_mut() {
            issues.extend(retain_valid(&mut model.quality, name));
            for (field_name, field) in model.fields.iter_mut() {
                issues.extend(field.validate_at(&format!("{}.{}", name, field_name)));
            }
        }
        issues
    }

    fn default_instance() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            "sample_field".to_string(),
            FieldDef::new("text", "Sample field; replace with a real column"),
        );
        let mut models = BTreeMap::new();
        models.insert(
            "sample_table".to_string(),
            ModelDef {
                model_type: "table".to_string(),
                description: "Sample table; describe the data to model".to_string(),
                fields,
                ..ModelDef::default()
            },
        );
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::normalize;
    use serde_json::json;

    #[test]
    fn test_default_has_sample_table() {
        let models: DataModels = normalize(&json!({}));
        let table = &models["sample_table"];
        assert_eq!(table.model_type, "table");
        assert!(table.fields.contains_key("sample_field"));
    }

    #[test]
    fn test_deeply_nested_fields() {
        let mut leaf = json!({"type": "string", "description": "leaf"});
        for level in 0..12 {
            leaf = json!({"type": "object", "description": format!("level {}", level), "fields": {"child": leaf}});
        }
        let models: DataModels = normalize(&json!({
            "events": {"type": "table", "description": "e", "fields": {"payload": leaf}}
        }));
        let payload = &models["events"].fields["payload"];
        assert_eq!(payload.depth(), 12);

        let mut cursor = payload;
        while let Some(child) = cursor.fields.get("child") {
            cursor = child;
        }
        assert_eq!(cursor.description, "leaf");
    }

    #[test]
    fn test_field_coercions() {
        let models: DataModels = normalize(&json!({
            "customers": {
                "type": "table",
                "fields": {
                    "id": {"type": "uuid", "primaryKey": "true", "format": "UUID", "required": 1},
                    "age": "integer",
                    "email": {"type": "string", "format": "phone", "pii": "yes", "tags": "contact"},
                    "scores": {"type": "array", "items": {"type": "number", "minimum": "0"}}
                }
            }
        }));
        let customers = &models["customers"];
        assert_eq!(customers.description, "");
        let id = &customers.fields["id"];
        assert_eq!(id.primary_key, Some(true));
        assert_eq!(id.required, Some(true));
        assert_eq!(id.format, Some(FieldFormat::Uuid));
        assert_eq!(customers.fields["age"].field_type, "integer");
        let email = &customers.fields["email"];
        assert_eq!(email.format, None);
        assert_eq!(email.pii, Some(true));
        assert_eq!(email.tags, Some(vec!["contact".to_string()]));
        let items = customers.fields["scores"].items.as_ref().unwrap();
        assert_eq!(items.minimum, Some(0.0));
    }

    #[test]
    fn test_invalid_constraints_are_nulled() {
        let models: DataModels = normalize(&json!({
            "t": {"type": "table", "description": "d", "fields": {
                "code": {"type": "string", "description": "c", "pattern": "([a-z", "minLength": 5, "maxLength": 2},
                "nested": {"type": "object", "description": "n", "fields": {
                    "x": {"type": "int", "description": "x", "quality": [{"type": "sql"}]}
                }}
            }}
        }));
        let code = &models["t"].fields["code"];
        assert_eq!(code.pattern, None);
        assert_eq!(code.min_length, None);
        assert_eq!(code.max_length, None);
        assert!(models["t"].fields["nested"].fields["x"].quality.is_empty());
    }

    #[test]
    fn test_serialized_model_uses_wire_names() {
        let models: DataModels = normalize(&json!({
            "t": {"type": "table", "description": "d", "fields": {
                "id": {"type": "int", "description": "id", "primaryKey": true, "enum": ["1", "2"]}
            }}
        }));
        let value = serde_json::to_value(&models).unwrap();
        assert_eq!(value["t"]["fields"]["id"]["primaryKey"], json!(true));
        assert_eq!(value["t"]["fields"]["id"]["enum"], json!(["1", "2"]));
        assert!(value["t"]["fields"]["id"].get("pattern").is_none());
        let back: DataModels = serde_json::from_value(value).unwrap();
        assert_eq!(back, models);
    }

    #[test]
    fn test_has_quality_sees_nested_fields() {
        let models: DataModels = normalize(&json!({
            "t": {"type": "table", "description": "d", "fields": {
                "a": {"type": "object", "description": "a", "fields": {
                    "b": {"type": "int", "description": "b", "quality": [{"type": "text", "description": "positive"}]}
                }},
                "c": {"type": "int", "description": "c"}
            }}
        }));
        assert!(models["t"].has_quality());
        assert!(models["t"].fields["a"].has_quality());
        assert!(!models["t"].fields["c"].has_quality());
    }
}
