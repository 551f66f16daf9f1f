// Servers: where the contract's data physically lives.
// Discriminated by `type`; only the backends below are supported and any
// other discriminator is rejected.

use crate::contract::normalize::{null_if, Fields, Section};
use crate::contract::{FromRaw, SectionData, SectionKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type ServerMap = BTreeMap<String, Server>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    S3,
    Redshift,
}

impl ServerKind {
    pub const ALL: [ServerKind; 2] = [ServerKind::S3, ServerKind::Redshift];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerKind::S3 => "s3",
            ServerKind::Redshift => "redshift",
        }
    }

    /// Generation prompt for this backend
    pub fn prompt_name(&self) -> &'static str {
        match self {
            ServerKind::S3 => "s3_server",
            ServerKind::Redshift => "redshift_server",
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s
            .trim_matches(|c: char| c.is_whitespace() || "\"'`[]().".contains(c))
            .to_lowercase();
        match token.as_str() {
            "s3" => Ok(ServerKind::S3),
            "redshift" => Ok(ServerKind::Redshift),
            _ => Err(format!("unsupported server type '{}'", s.trim())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Server {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl FromRaw for S3Server {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            description: f.opt_string("description"),
            environment: f.opt_string("environment"),
            location: f.opt_string("location"),
            endpoint_url: f.opt_string_any(&["endpointUrl", "endpoint_url"]),
            format: f.opt_string("format"),
            delimiter: f.opt_string("delimiter"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedshiftServer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl FromRaw for RedshiftServer {
    fn from_raw(raw: &Value) -> Self {
        let f = Fields::of(raw);
        Self {
            description: f.opt_string("description"),
            environment: f.opt_string("environment"),
            account: f.opt_string("account"),
            database: f.opt_string("database"),
            schema: f.opt_string("schema"),
            cluster_identifier: f.opt_string_any(&["clusterIdentifier", "cluster_identifier"]),
            host: f.opt_string("host"),
            port: f.opt_i64("port"),
            endpoint: f.opt_string("endpoint"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Server {
    S3(S3Server),
    Redshift(RedshiftServer),
}

impl Server {
    pub fn kind(&self) -> ServerKind {
        match self {
            Server::S3(_) => ServerKind::S3,
            Server::Redshift(_) => ServerKind::Redshift,
        }
    }

    /// Select the variant by `type` before reading its fields.
    /// A missing tag falls back to `expected` when the caller knows it.
    pub fn from_raw_tagged(raw: &Value, expected: Option<ServerKind>) -> Result<Self, String> {
        let f = Fields::of(raw);
        let kind = match f.opt_string("type") {
            Some(tag) => tag.parse::<ServerKind>()?,
            None => expected.ok_or_else(|| "server entry without a type".to_string())?,
        };
        Ok(match kind {
            ServerKind::S3 => Server::S3(S3Server::from_raw(raw)),
            ServerKind::Redshift => Server::Redshift(RedshiftServer::from_raw(raw)),
        })
    }
}

/// Read a server section body. Accepts either a name-keyed map of servers
/// or one bare server object, which is keyed by its type. Entries with an
/// unsupported or unexpected type are dropped and reported.
pub fn servers_from_raw(raw: &Value, expected: Option<ServerKind>) -> (ServerMap, Vec<String>) {
    let mut servers = ServerMap::new();
    let mut issues = Vec::new();

    let Some(map) = raw.as_object() else {
        issues.push("server body is not an object".to_string());
        return (servers, issues);
    };

    let is_bare = map.get("type").is_some_and(Value::is_string);
    let entries: Vec<(String, &Value)> = if is_bare {
        let name = map
            .get("type")
            .and_then(Value::as_str)
            .map(|t| t.trim().to_lowercase())
            .unwrap_or_default();
        vec![(name, raw)]
    } else {
        map.iter().map(|(k, v)| (k.trim().to_string(), v)).collect()
    };

    for (name, entry) in entries {
        if name.is_empty() || !entry.is_object() {
            issues.push(format!("skipping server entry '{}' that is not an object", name));
            continue;
        }
        match Server::from_raw_tagged(entry, expected) {
            Ok(server) if expected.is_some_and(|k| k != server.kind()) => {
                issues.push(format!(
                    "server '{}' has type {} but {} was requested",
                    name,
                    server.kind(),
                    expected.map(|k| k.as_str()).unwrap_or_default()
                ));
            }
            Ok(server) => {
                servers.insert(name, server);
            }
            Err(e) => issues.push(format!("rejecting server '{}': {}", name, e)),
        }
    }

    (servers, issues)
}

impl FromRaw for ServerMap {
    fn from_raw(raw: &Value) -> Self {
        let (servers, issues) = servers_from_raw(raw, None);
        for issue in issues {
            log::warn!("{}", issue);
        }
        servers
    }
}

impl Section for ServerMap {
    const KIND: SectionKind = SectionKind::Server;

    fn into_data(self) -> SectionData {
        SectionData::Server(self)
    }

    fn validate(&mut self) -> Vec<String> {
        let mut issues = Vec::new();
        for (name, server) in self.iter_mut() {
            match server {
                Server::S3(s3) => null_if(
                    &mut s3.location,
                    |l| l.trim().is_empty(),
                    &mut issues,
                    &format!("{}.location", name),
                ),
                Server::Redshift(rs) => null_if(
                    &mut rs.port,
                    |p| !(1..=65535).contains(p),
                    &mut issues,
                    &format!("{}.port", name),
                ),
            }
        }
        issues
    }

    fn default_instance() -> Self {
        let mut servers = ServerMap::new();
        servers.insert(
            "sample_s3".to_string(),
            Server::S3(S3Server {
                description: Some("Sample S3 location; replace with the real bucket".to_string()),
                environment: Some("dev".to_string()),
                location: Some("s3://sample-bucket/data/".to_string()),
                format: Some("csv".to_string()),
                delimiter: Some(",".to_string()),
                ..S3Server::default()
            }),
        );
        servers
    }
}
