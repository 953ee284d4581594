//! Linked entities: reference records (canals, rides, headgates, ...) that a
//! drawing can point at through `linkedEntityId`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::drawing::{DrawingStatus, ElementType};
use crate::types::{RecordId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedEntity {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub entity_type: ElementType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: DrawingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_role: Option<String>,
    /// Type-specific fields (`length`, `maxFlow`, `riderId`, ...), inlined on
    /// the wire.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
