//! Repository for the `linked_entities` table.

use fieldmark_core::drawing::ElementType;
use fieldmark_core::entity::LinkedEntity;
use sqlx::PgPool;

use crate::models::entity::LinkedEntityRow;

/// Column list for linked_entities queries.
const COLUMNS: &str = "id, entity_type, name, description, status, contact_name, \
    contact_phone, contact_email, contact_role, attributes, created_at, updated_at";

/// Provides read and upsert operations for linked entities.
pub struct LinkedEntityRepo;

impl LinkedEntityRepo {
    /// List entities of one type, ordered by name.
    ///
    /// Types without reference records (hazard, maintenance, custom) return
    /// an empty list without touching the database.
    pub async fn list_by_type(
        pool: &PgPool,
        entity_type: ElementType,
    ) -> Result<Vec<LinkedEntity>, sqlx::Error> {
        if !entity_type.has_records() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM linked_entities
             WHERE entity_type = $1
             ORDER BY name ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, LinkedEntityRow>(&query)
            .bind(entity_type.as_str())
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().filter_map(LinkedEntityRow::into_entity).collect())
    }

    /// Find one entity of a given type.
    pub async fn find_by_id(
        pool: &PgPool,
        entity_type: ElementType,
        id: &str,
    ) -> Result<Option<LinkedEntity>, sqlx::Error> {
        if !entity_type.has_records() {
            return Ok(None);
        }
        let query = format!(
            "SELECT {COLUMNS} FROM linked_entities WHERE entity_type = $1 AND id = $2"
        );
        let row = sqlx::query_as::<_, LinkedEntityRow>(&query)
            .bind(entity_type.as_str())
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.and_then(LinkedEntityRow::into_entity))
    }

    /// Insert or replace an entity.
    pub async fn upsert(pool: &PgPool, entity: &LinkedEntity) -> Result<LinkedEntity, sqlx::Error> {
        let row = LinkedEntityRow::try_from(entity).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let query = format!(
            "INSERT INTO linked_entities ({COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (id) DO UPDATE SET
                entity_type = EXCLUDED.entity_type, name = EXCLUDED.name,
                description = EXCLUDED.description, status = EXCLUDED.status,
                contact_name = EXCLUDED.contact_name, contact_phone = EXCLUDED.contact_phone,
                contact_email = EXCLUDED.contact_email, contact_role = EXCLUDED.contact_role,
                attributes = EXCLUDED.attributes, updated_at = EXCLUDED.updated_at
             RETURNING {COLUMNS}"
        );
        let saved = sqlx::query_as::<_, LinkedEntityRow>(&query)
            .bind(&row.id)
            .bind(&row.entity_type)
            .bind(&row.name)
            .bind(&row.description)
            .bind(&row.status)
            .bind(&row.contact_name)
            .bind(&row.contact_phone)
            .bind(&row.contact_email)
            .bind(&row.contact_role)
            .bind(&row.attributes)
            .bind(row.created_at)
            .bind(row.updated_at)
            .fetch_one(pool)
            .await?;
        saved
            .into_entity()
            .ok_or_else(|| sqlx::Error::Decode("stored entity has an unknown type".into()))
    }
}
