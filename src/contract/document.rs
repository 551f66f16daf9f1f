// Contract-Drafter: Accumulated contract document
// One optional slot per section. A slot is either empty (never drafted) or
// holds a normalized instance; only the coordinator's merge step writes it.

use super::normalize::Fields;
use super::{
    DataModels, Definitions, MetaInfo, SectionData, SectionKind, ServerMap, ServiceLevels, Terms,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Id given to seeds that arrive without one
pub const AUTO_GENERATED_ID: &str = "auto-generated-id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metainfo: Option<MetaInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<Terms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_models: Option<DataModels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servicelevels: Option<ServiceLevels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Definitions>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with a fresh `urn:datacontract:` id
    pub fn new() -> Self {
        Self::with_id(format!("urn:datacontract:{}", Uuid::new_v4()))
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metainfo: None,
            server: None,
            terms: None,
            data_models: None,
            servicelevels: None,
            definitions: None,
        }
    }

    /// Load a caller-supplied partial document. Every present section is
    /// normalized; malformed ones end up degraded, never rejected.
    pub fn from_seed(seed: &Value) -> Self {
        let f = Fields::of(seed);
        let id = f
            .opt_string("id")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| AUTO_GENERATED_ID.to_string());
        let mut document = Self::with_id(id);

        for kind in SectionKind::ALL {
            let raw = match kind {
                SectionKind::DataModels => f.get_any(&["data_models", "data_model"]),
                _ => f.get(kind.as_str()),
            };
            let Some(raw) = raw else { continue };
            let data = SectionData::normalize(kind, raw);
            if data.is_empty() {
                log::warn!("Seed section {} has no usable content, leaving it unset", kind);
                continue;
            }
            document.set(data);
        }
        document
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            log::error!("Failed to serialize document {}: {}", self.id, e);
            let mut map = Map::new();
            map.insert("id".to_string(), Value::String(self.id.clone()));
            Value::Object(map)
        })
    }

    pub fn get(&self, kind: SectionKind) -> Option<SectionData> {
        match kind {
            SectionKind::MetaInfo => self.metainfo.clone().map(SectionData::MetaInfo),
            SectionKind::Server => self.server.clone().map(SectionData::Server),
            SectionKind::Terms => self.terms.clone().map(SectionData::Terms),
            SectionKind::DataModels => self.data_models.clone().map(SectionData::DataModels),
            SectionKind::ServiceLevels => {
                self.servicelevels.clone().map(SectionData::ServiceLevels)
            }
            SectionKind::Definitions => self.definitions.clone().map(SectionData::Definitions),
        }
    }

    /// Replace the slot for this section wholesale
    pub fn set(&mut self, data: SectionData) {
        match data {
            SectionData::MetaInfo(s) => self.metainfo = Some(s),
            SectionData::Server(s) => self.server = Some(s),
            SectionData::Terms(s) => self.terms = Some(s),
            SectionData::DataModels(s) => self.data_models = Some(s),
            SectionData::ServiceLevels(s) => self.servicelevels = Some(s),
            SectionData::Definitions(s) => self.definitions = Some(s),
        }
    }

    /// Slot is present and holds something other than an empty instance
    pub fn has_content(&self, kind: SectionKind) -> bool {
        self.get(kind).is_some_and(|data| !data.is_empty())
    }

    /// Prior content for update framing, if the slot has any
    pub fn prior(&self, kind: SectionKind) -> Option<Value> {
        self.get(kind)
            .filter(|data| !data.is_empty())
            .map(|data| data.to_value())
    }

    /// Sections that currently hold content, in canonical order
    pub fn filled_sections(&self) -> Vec<SectionKind> {
        SectionKind::ALL
            .into_iter()
            .filter(|kind| self.has_content(*kind))
            .collect()
    }

    /// A fresh document carrying only the id
    pub fn is_blank(&self) -> bool {
        self.filled_sections().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Section;
    use serde_json::json;

    #[test]
    fn test_new_document_has_urn_id() {
        let document = Document::new();
        assert!(document.id.starts_with("urn:datacontract:"));
        assert!(document.is_blank());
        assert_ne!(Document::new().id, document.id);
    }

    #[test]
    fn test_seed_keeps_id_and_normalizes_sections() {
        let document = Document::from_seed(&json!({
            "id": "urn:datacontract:orders",
            "metainfo": {"title": "Orders", "status": "active"},
            "data_model": {"orders": {"type": "table", "fields": {"id": "int"}}},
            "terms": {"noticePeriod": "soon"}
        }));
        assert_eq!(document.id, "urn:datacontract:orders");
        assert_eq!(document.metainfo.as_ref().unwrap().title, "Orders");
        assert!(document.data_models.as_ref().unwrap().contains_key("orders"));
        // every terms field was invalid, so the slot stays unset
        assert!(document.terms.is_none());
        assert!(document.server.is_none());
        assert_eq!(
            document.filled_sections(),
            vec![SectionKind::MetaInfo, SectionKind::DataModels]
        );
    }

    #[test]
    fn test_seed_without_id_gets_placeholder() {
        let document = Document::from_seed(&json!({"terms": {"usage": "u"}}));
        assert_eq!(document.id, AUTO_GENERATED_ID);
        let document = Document::from_seed(&json!("not an object"));
        assert_eq!(document.id, AUTO_GENERATED_ID);
        assert!(document.is_blank());
    }

    #[test]
    fn test_document_value_round_trip() {
        let mut document = Document::with_id("doc-1");
        document.set(SectionData::DataModels(DataModels::default_instance()));
        document.set(SectionData::Server(ServerMap::default_instance()));
        let value = document.to_value();
        assert_eq!(value["server"]["sample_s3"]["type"], json!("s3"));
        assert!(value.get("terms").is_none());
        assert_eq!(Document::from_value(value).unwrap(), document);
    }

    #[test]
    fn test_prior_skips_empty_slots() {
        let mut document = Document::with_id("doc-1");
        document.set(SectionData::ServiceLevels(ServiceLevels::default()));
        assert!(document.prior(SectionKind::ServiceLevels).is_none());
        assert!(document.servicelevels.is_some());

        document.set(SectionData::Terms(Terms::default_instance()));
        let prior = document.prior(SectionKind::Terms).unwrap();
        assert!(prior["usage"].is_string());
    }
}
