// Contract-Drafter: Data contract document model
// Section identifiers, the section schemas, and the accumulated document.

pub mod document;
pub mod normalize;
pub mod schema;

pub use document::{Document, AUTO_GENERATED_ID};
pub use normalize::{normalize, FromRaw, Section};
pub use schema::*;

use crate::error::DrafterError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Closed set of document sections a turn can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    #[serde(rename = "metainfo")]
    MetaInfo,
    Server,
    Terms,
    DataModels,
    #[serde(rename = "servicelevels")]
    ServiceLevels,
    Definitions,
}

impl SectionKind {
    /// Canonical order, also the document's serialization order
    pub const ALL: [SectionKind; 6] = [
        SectionKind::MetaInfo,
        SectionKind::Server,
        SectionKind::Terms,
        SectionKind::DataModels,
        SectionKind::ServiceLevels,
        SectionKind::Definitions,
    ];

    /// Key used in the document, in model output, and as the prompt name
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::MetaInfo => "metainfo",
            SectionKind::Server => "server",
            SectionKind::Terms => "terms",
            SectionKind::DataModels => "data_models",
            SectionKind::ServiceLevels => "servicelevels",
            SectionKind::Definitions => "definitions",
        }
    }

    pub fn prompt_name(&self) -> &'static str {
        self.as_str()
    }

    /// Keys a model response may file this section under
    pub fn body_keys(&self) -> &'static [&'static str] {
        match self {
            SectionKind::DataModels => &["data_models", "data_model"],
            SectionKind::MetaInfo => &["metainfo"],
            SectionKind::Server => &["server"],
            SectionKind::Terms => &["terms"],
            SectionKind::ServiceLevels => &["servicelevels"],
            SectionKind::Definitions => &["definitions"],
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = DrafterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s
            .trim_matches(|c: char| c.is_whitespace() || "\"'`[]().".contains(c))
            .to_lowercase();
        match token.as_str() {
            "metainfo" => Ok(SectionKind::MetaInfo),
            "server" => Ok(SectionKind::Server),
            "terms" => Ok(SectionKind::Terms),
            "data_models" | "data_model" => Ok(SectionKind::DataModels),
            "servicelevels" => Ok(SectionKind::ServiceLevels),
            "definitions" => Ok(SectionKind::Definitions),
            _ => Err(DrafterError::Parse(format!("unknown section '{}'", s.trim()))),
        }
    }
}

/// One normalized section value, tagged with its kind
#[derive(Debug, Clone, PartialEq)]
pub enum SectionData {
    MetaInfo(MetaInfo),
    Server(ServerMap),
    Terms(Terms),
    DataModels(DataModels),
    ServiceLevels(ServiceLevels),
    Definitions(Definitions),
}

impl SectionData {
    pub fn kind(&self) -> SectionKind {
        match self {
            SectionData::MetaInfo(_) => SectionKind::MetaInfo,
            SectionData::Server(_) => SectionKind::Server,
            SectionData::Terms(_) => SectionKind::Terms,
            SectionData::DataModels(_) => SectionKind::DataModels,
            SectionData::ServiceLevels(_) => SectionKind::ServiceLevels,
            SectionData::Definitions(_) => SectionKind::Definitions,
        }
    }

    /// Normalize `raw` as a section of the given kind
    pub fn normalize(kind: SectionKind, raw: &Value) -> Self {
        match kind {
            SectionKind::MetaInfo => SectionData::MetaInfo(normalize(raw)),
            SectionKind::Server => SectionData::Server(normalize(raw)),
            SectionKind::Terms => SectionData::Terms(normalize(raw)),
            SectionKind::DataModels => SectionData::DataModels(normalize(raw)),
            SectionKind::ServiceLevels => SectionData::ServiceLevels(normalize(raw)),
            SectionKind::Definitions => SectionData::Definitions(normalize(raw)),
        }
    }

    pub fn default_for(kind: SectionKind) -> Self {
        match kind {
            SectionKind::MetaInfo => SectionData::MetaInfo(MetaInfo::default_instance()),
            SectionKind::Server => SectionData::Server(ServerMap::default_instance()),
            SectionKind::Terms => SectionData::Terms(Terms::default_instance()),
            SectionKind::DataModels => SectionData::DataModels(DataModels::default_instance()),
            SectionKind::ServiceLevels => {
                SectionData::ServiceLevels(ServiceLevels::default_instance())
            }
            SectionKind::Definitions => SectionData::Definitions(Definitions::default_instance()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SectionData::MetaInfo(s) => s.is_empty(),
            SectionData::Server(s) => s.is_empty(),
            SectionData::Terms(s) => s.is_empty(),
            SectionData::DataModels(s) => s.is_empty(),
            SectionData::ServiceLevels(s) => Section::is_empty(s),
            SectionData::Definitions(s) => s.is_empty(),
        }
    }

    pub fn to_value(&self) -> Value {
        let value = match self {
            SectionData::MetaInfo(s) => serde_json::to_value(s),
            SectionData::Server(s) => serde_json::to_value(s),
            SectionData::Terms(s) => serde_json::to_value(s),
            SectionData::DataModels(s) => serde_json::to_value(s),
            SectionData::ServiceLevels(s) => serde_json::to_value(s),
            SectionData::Definitions(s) => serde_json::to_value(s),
        };
        value.unwrap_or_else(|e| {
            log::error!("Failed to serialize section {}: {}", self.kind(), e);
            Value::Null
        })
    }
}
