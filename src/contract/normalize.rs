// Contract-Drafter: Normalization engine
// Coerces untrusted JSON (parsed model output, caller seeds) into schema
// instances. Total by construction: nothing in here returns an error.
//
// Per field: present and non-null values are coerced to the declared shape,
// absent required strings become "", everything else absent stays None.
// After assembly each section runs its own validation, which nulls the
// fields that break an invariant and reports them for logging.

use super::{SectionData, SectionKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::str::FromStr;

/// Build a record from an arbitrary JSON value, defaulting what is missing
pub trait FromRaw: Sized {
    fn from_raw(raw: &Value) -> Self;
}

/// A top-level document section
pub trait Section:
    FromRaw + Serialize + DeserializeOwned + Clone + Default + PartialEq + Debug + Send + Sync
{
    const KIND: SectionKind;

    fn into_data(self) -> SectionData;

    /// Null out fields that violate an invariant; returns one line per fix.
    fn validate(&mut self) -> Vec<String> {
        Vec::new()
    }

    /// Hand-authored example content used for empty input and worker fallbacks
    fn default_instance() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Normalize raw data into a section instance.
///
/// Empty input yields the section's default instance so consumers always
/// see structurally valid example content.
pub fn normalize<S: Section>(raw: &Value) -> S {
    if is_blank(raw) {
        log::debug!("Empty input for section {}, using default instance", S::KIND);
        return S::default_instance();
    }

    let mut candidate = S::from_raw(raw);
    for issue in candidate.validate() {
        log::warn!("Section {} failed validation: {}", S::KIND, issue);
    }
    candidate
}

/// `null`, `{}`, `[]`, and blank strings carry no data
pub fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ============================================================================
// Scalar coercions
// ============================================================================

pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Field reader
// ============================================================================

/// Read-only view over one JSON object with shape-directed accessors.
/// A non-object value reads as an object with no fields.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    pub fn of(raw: &'a Value) -> Self {
        Self { map: raw.as_object() }
    }

    /// The value under `key`, treating `null` as absent
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map?.get(key).filter(|v| !v.is_null())
    }

    /// First present key among `keys` (camelCase first, then tolerated spellings)
    pub fn get_any(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Required string: `""` when absent or not a scalar
    pub fn string(&self, key: &str) -> String {
        self.opt_string(key).unwrap_or_default()
    }

    pub fn opt_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(as_string)
    }

    pub fn opt_string_any(&self, keys: &[&str]) -> Option<String> {
        self.get_any(keys).and_then(as_string)
    }

    pub fn opt_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(as_bool)
    }

    pub fn opt_bool_any(&self, keys: &[&str]) -> Option<bool> {
        self.get_any(keys).and_then(as_bool)
    }

    pub fn opt_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(as_i64)
    }

    pub fn opt_i64_any(&self, keys: &[&str]) -> Option<i64> {
        self.get_any(keys).and_then(as_i64)
    }

    pub fn opt_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(as_f64)
    }

    /// List of strings; a lone scalar becomes a one-element list
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            Value::Array(items) => Some(items.iter().filter_map(as_string).collect()),
            other => as_string(other).map(|s| vec![s]),
        }
    }

    /// List of arbitrary values (e.g. examples); a lone value is wrapped
    pub fn values(&self, key: &str) -> Option<Vec<Value>> {
        match self.get(key)? {
            Value::Array(items) => Some(items.clone()),
            other => Some(vec![other.clone()]),
        }
    }

    /// String matched against a closed value set; unknown values become None
    pub fn closed<E: FromStr>(&self, key: &str) -> Option<E> {
        let raw = self.opt_string(key)?;
        match raw.parse::<E>() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Dropping unsupported value '{}' for field '{}'", raw, key);
                None
            }
        }
    }

    pub fn record<T: FromRaw>(&self, key: &str) -> Option<T> {
        self.get(key).filter(|v| v.is_object()).map(T::from_raw)
    }

    pub fn boxed<T: FromRaw>(&self, key: &str) -> Option<Box<T>> {
        self.record(key).map(Box::new)
    }

    /// List of records; a lone object becomes a one-element list
    pub fn list<T: FromRaw>(&self, key: &str) -> Vec<T> {
        match self.get(key) {
            Some(Value::Array(items)) => items.iter().map(T::from_raw).collect(),
            Some(obj @ Value::Object(_)) => vec![T::from_raw(obj)],
            _ => Vec::new(),
        }
    }

    /// Name-keyed records; see [`map_of`]
    pub fn map<T: FromRaw>(&self, key: &str) -> BTreeMap<String, T> {
        self.get(key).map(map_of).unwrap_or_default()
    }
}

/// Name-keyed records from either `{name: {...}}` or `[{"name": ..., ...}]`.
/// Entries without a usable name are skipped.
pub fn map_of<T: FromRaw>(raw: &Value) -> BTreeMap<String, T> {
    let mut out = BTreeMap::new();
    match raw {
        Value::Object(map) => {
            for (name, value) in map {
                let name = name.trim();
                if name.is_empty() || value.is_null() {
                    continue;
                }
                out.insert(name.to_string(), T::from_raw(value));
            }
        }
        Value::Array(items) => {
            for item in items {
                let name = Fields::of(item).opt_string("name");
                match name.as_deref().map(str::trim) {
                    Some(name) if !name.is_empty() => {
                        out.insert(name.to_string(), T::from_raw(item));
                    }
                    _ => log::debug!("Skipping unnamed list entry: {}", item),
                }
            }
        }
        _ => {}
    }
    out
}

/// Drop `Some(v)` when the check fails, recording why
pub fn null_if<T: Debug>(
    slot: &mut Option<T>,
    invalid: impl FnOnce(&T) -> bool,
    issues: &mut Vec<String>,
    what: &str,
) {
    if slot.as_ref().is_some_and(invalid) {
        if let Some(dropped) = slot.take() {
            issues.push(format!("{} {:?} is invalid", what, dropped));
        }
    }
}
