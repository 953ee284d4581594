//! `linked_entities` row.

use fieldmark_core::drawing::{DrawingStatus, ElementType};
use fieldmark_core::entity::LinkedEntity;
use fieldmark_core::types::Timestamp;
use serde_json::{Map, Value};
use sqlx::FromRow;

use super::{decode_enum, decode_json, encode_enum};

/// A row from the `linked_entities` table.
#[derive(Debug, Clone, FromRow)]
pub struct LinkedEntityRow {
    pub id: String,
    pub entity_type: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub contact_role: Option<String>,
    pub attributes: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LinkedEntityRow {
    /// Convert to the domain type. Rows with an unknown entity type are
    /// skipped with a warning.
    pub fn into_entity(self) -> Option<LinkedEntity> {
        let entity_type: ElementType =
            decode_enum(Some(&self.entity_type), "entity_type", &self.id)?;
        let attributes: Map<String, Value> =
            decode_json(Some(&self.attributes), "attributes", &self.id).unwrap_or_default();
        let status = decode_enum(Some(&self.status), "status", &self.id)
            .unwrap_or(DrawingStatus::Active);

        Some(LinkedEntity {
            id: self.id,
            entity_type,
            name: self.name,
            description: self.description,
            status,
            contact_name: self.contact_name,
            contact_phone: self.contact_phone,
            contact_email: self.contact_email,
            contact_role: self.contact_role,
            attributes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&LinkedEntity> for LinkedEntityRow {
    type Error = serde_json::Error;

    fn try_from(e: &LinkedEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: e.id.clone(),
            entity_type: e.entity_type.as_str().to_string(),
            name: e.name.clone(),
            description: e.description.clone(),
            status: encode_enum(&e.status)?,
            contact_name: e.contact_name.clone(),
            contact_phone: e.contact_phone.clone(),
            contact_email: e.contact_email.clone(),
            contact_role: e.contact_role.clone(),
            attributes: serde_json::to_string(&e.attributes)?,
            created_at: e.created_at,
            updated_at: e.updated_at,
        })
    }
}
