use crate::contract::normalize::{null_if, Fields, FromRaw, Section};
use crate::contract::{SectionData, SectionKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// e.g. `99.9%`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retention {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_field: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Latency {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_timestamp_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_timestamp_field: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Freshness {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_field: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frequency {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `batch`, `micro-batching`, `streaming`, `manual`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub frequency_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Support {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_point: Option<String>,
}

impl FromRaw for Availability {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            description: f.opt_string("description"),
            percentage: f.opt_string("percentage"),
        }
    }
}

impl FromRaw for Retention {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            description: f.opt_string("description"),
            period: f.opt_string("period"),
            unlimited: f.opt_bool("unlimited"),
            timestamp_field: f.opt_string_any(&["timestampField", "timestamp_field"]),
        }
    }
}

impl FromRaw for Latency {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            description: f.opt_string("description"),
            threshold: f.opt_string("threshold"),
            source_timestamp_field: f
                .opt_string_any(&["sourceTimestampField", "source_timestamp_field"]),
            processed_timestamp_field: f
                .opt_string_any(&["processedTimestampField", "processed_timestamp_field"]),
        }
    }
}

impl FromRaw for Freshness {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            description: f.opt_string("description"),
            threshold: f.opt_string("threshold"),
            timestamp_field: f.opt_string_any(&["timestampField", "timestamp_field"]),
        }
    }
}

impl FromRaw for Frequency {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            description: f.opt_string("description"),
            frequency_type: f.opt_string("type"),
            interval: f.opt_string("interval"),
            cron: f.opt_string("cron"),
        }
    }
}

impl FromRaw for Support {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            description: f.opt_string("description"),
            time: f.opt_string("time"),
            response_time: f.opt_string_any(&["responseTime", "response_time"]),
        }
    }
}

impl FromRaw for Backup {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            description: f.opt_string("description"),
            interval: f.opt_string("interval"),
            cron: f.opt_string("cron"),
            recovery_time: f.opt_string_any(&["recoveryTime", "recovery_time"]),
            recovery_point: f.opt_string_any(&["recoveryPoint", "recovery_point"]),
        }
    }
}

/// Operational guarantees for the data product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLevels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<Retention>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<Latency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness: Option<Freshness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support: Option<Support>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<Backup>,
}

impl FromRaw for ServiceLevels {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            availability: f.record("availability"),
            retention: f.record("retention"),
            latency: f.record("latency"),
            freshness: f.record("freshness"),
            frequency: f.record("frequency"),
            support: f.record("support"),
            backup: f.record("backup"),
        }
    }
}

impl Section for ServiceLevels {
    const KIND: SectionKind = SectionKind::ServiceLevels;

    fn into_data(self) -> SectionData {
        SectionData::ServiceLevels(self)
    }

    fn validate(&mut self) -> Vec<String> {
        let mut issues = Vec::new();
        if let Some(availability) = self.availability.as_mut() {
            null_if(
                &mut availability.percentage,
                |p| !is_percentage(p),
                &mut issues,
                "availability.percentage",
            );
        }
        // Cron expressions carry five or six space-separated fields
        let cron_ok = |c: &String| (5..=6).contains(&c.split_whitespace().count());
        if let Some(frequency) = self.frequency.as_mut() {
            null_if(&mut frequency.cron, |c| !cron_ok(c), &mut issues, "frequency.cron");
        }
        if let Some(backup) = self.backup.as_mut() {
            null_if(&mut backup.cron, |c| !cron_ok(c), &mut issues, "backup.cron");
        }
        issues
    }
}

fn is_percentage(value: &str) -> bool {
    value
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .is_ok_and(|p| (0.0..=100.0).contains(&p))
}
