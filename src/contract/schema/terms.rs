use crate::contract::normalize::{as_string, null_if, Fields, FromRaw, Section};
use crate::contract::{SectionData, SectionKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ISO-8601 duration, e.g. P3M, P1Y2M10DT2H30M, PT0.5S
static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(\d+Y)?(\d+M)?(\d+W)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$")
        .expect("duration pattern is valid")
});

pub fn is_iso_duration(value: &str) -> bool {
    // The pattern alone also admits "P" and a bare "T" designator
    ISO_DURATION.is_match(value) && value != "P" && !value.ends_with('T')
}

/// Usage terms and commercial conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terms {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limitations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice_period: Option<String>,
}

impl FromRaw for Terms {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            usage: f.opt_string("usage"),
            limitations: f.opt_string("limitations"),
            policy: read_policy(f.get_any(&["policy", "policies"])),
            billing: f.opt_string("billing"),
            notice_period: f.opt_string_any(&["noticePeriod", "notice_period"]),
        }
    }
}

// Policies arrive as plain strings or as `{name, description, url}` objects
fn read_policy(raw: Option<&Value>) -> Option<Vec<String>> {
    let entry = |v: &Value| -> Option<String> {
        match v {
            Value::Object(_) => {
                let f = Fields::of(v);
                let name = f.opt_string("name").or_else(|| f.opt_string("description"))?;
                Some(match f.opt_string("url") {
                    Some(url) => format!("{} ({})", name, url),
                    None => name,
                })
            }
            other => as_string(other),
        }
    };
    match raw? {
        Value::Array(items) => Some(items.iter().filter_map(entry).collect()),
        other => entry(other).map(|p| vec![p]),
    }
}

impl Section for Terms {
    const KIND: SectionKind = SectionKind::Terms;

    fn into_data(self) -> SectionData {
        SectionData::Terms(self)
    }

    fn validate(&mut self) -> Vec<String> {
        let mut issues = Vec::new();
        null_if(
            &mut self.notice_period,
            |p| !is_iso_duration(p.trim()),
            &mut issues,
            "noticePeriod",
        );
        issues
    }

    fn default_instance() -> Self {
        Self {
            usage: Some("Sample usage; describe how consumers may use this data".to_string()),
            limitations: Some("Sample limitations; describe what is not permitted".to_string()),
            ..Self::default()
        }
    }
}
