use crate::contract::normalize::{Fields, FromRaw, Section};
use crate::contract::{SectionData, SectionKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Lifecycle status of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Proposed,
    #[serde(rename = "in development")]
    InDevelopment,
    Active,
    Deprecated,
    Retired,
}

impl FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "proposed" => Ok(ContractStatus::Proposed),
            "in development" => Ok(ContractStatus::InDevelopment),
            "active" => Ok(ContractStatus::Active),
            "deprecated" => Ok(ContractStatus::Deprecated),
            "retired" => Ok(ContractStatus::Retired),
            _ => Err(format!("unknown status '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FromRaw for Contact {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            name: f.opt_string("name"),
            email: f.opt_string("email"),
            url: f.opt_string("url"),
        }
    }
}

/// Title, ownership and status of the contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaInfo {
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContractStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

impl FromRaw for MetaInfo {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            title: f.string("title"),
            version: f.opt_string("version"),
            status: f.closed("status"),
            description: f.opt_string("description"),
            owner: f.opt_string("owner"),
            contact: f.record("contact"),
        }
    }
}

impl Section for MetaInfo {
    const KIND: SectionKind = SectionKind::MetaInfo;

    fn into_data(self) -> SectionData {
        SectionData::MetaInfo(self)
    }

    fn validate(&mut self) -> Vec<String> {
        let mut issues = Vec::new();
        if let Some(contact) = &mut self.contact {
            if contact.email.as_deref().is_some_and(|e| !e.contains('@')) {
                issues.push(format!("contact.email {:?} is not an address", contact.email));
                contact.email = None;
            }
            if *contact == Contact::default() {
                self.contact = None;
            }
        }
        issues
    }

    fn default_instance() -> Self {
        Self {
            title: "Untitled data contract".to_string(),
            status: Some(ContractStatus::Proposed),
            description: Some(
                "Draft data contract; describe the data product to fill this in.".to_string(),
            ),
            ..Self::default()
        }
    }
}
