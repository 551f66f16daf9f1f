// Contract-Drafter: Section schemas
// Plain serde records, camelCase on the wire. Optional fields are skipped
// when absent so a serialized section only carries what was drafted.

pub mod definitions;
pub mod info;
pub mod models;
pub mod quality;
pub mod server;
pub mod service_levels;
pub mod terms;

pub use definitions::{Definition, Definitions};
pub use info::{Contact, ContractStatus, MetaInfo};
pub use models::{DataModels, FieldDef, FieldFormat, ModelDef};
pub use quality::{DescriptionCheck, QualityCheck, SqlCheck, TextCheck};
pub use server::{RedshiftServer, S3Server, Server, ServerKind, ServerMap};
pub use service_levels::{
    Availability, Backup, Freshness, Frequency, Latency, Retention, ServiceLevels, Support,
};
pub use terms::Terms;
