//! Repository for the `drawings` table.

use fieldmark_core::approval::ApprovalStatus;
use fieldmark_core::drawing::{Drawing, Issue};
use fieldmark_core::privacy;
use fieldmark_core::roles::Role;
use fieldmark_core::types::Timestamp;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};

use crate::models::drawing::DrawingRow;

/// Column list for drawings queries, in bind order.
const COLUMNS: &str = "id, type, coordinates, marker_position, element_type, linked_entity_id, \
    name, color, farm, description, status, last_updated, category, privacy, cfs, order_amount, \
    notes, files, contact_name, contact_phone, contact_email, contact_role, contact_privacy, \
    issue_id, issue_description, issue_created_by, issue_created_by_role, issue_created_at, \
    issue_updated_at, approval_status, created_by, created_by_role, reviewed_by, reviewed_at, \
    review_notes, stroke_weight, fill_opacity, tool, created_at, updated_at";

/// `$1, $2, ... $40` matching [`COLUMNS`].
const PLACEHOLDERS: &str = "$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, \
    $34, $35, $36, $37, $38, $39, $40";

/// Every column except `id` and `created_at` is overwritten on upsert.
const UPSERT_SET: &str = "type = EXCLUDED.type, coordinates = EXCLUDED.coordinates, \
    marker_position = EXCLUDED.marker_position, element_type = EXCLUDED.element_type, \
    linked_entity_id = EXCLUDED.linked_entity_id, name = EXCLUDED.name, \
    color = EXCLUDED.color, farm = EXCLUDED.farm, description = EXCLUDED.description, \
    status = EXCLUDED.status, last_updated = EXCLUDED.last_updated, \
    category = EXCLUDED.category, privacy = EXCLUDED.privacy, cfs = EXCLUDED.cfs, \
    order_amount = EXCLUDED.order_amount, notes = EXCLUDED.notes, files = EXCLUDED.files, \
    contact_name = EXCLUDED.contact_name, contact_phone = EXCLUDED.contact_phone, \
    contact_email = EXCLUDED.contact_email, contact_role = EXCLUDED.contact_role, \
    contact_privacy = EXCLUDED.contact_privacy, issue_id = EXCLUDED.issue_id, \
    issue_description = EXCLUDED.issue_description, \
    issue_created_by = EXCLUDED.issue_created_by, \
    issue_created_by_role = EXCLUDED.issue_created_by_role, \
    issue_created_at = EXCLUDED.issue_created_at, \
    issue_updated_at = EXCLUDED.issue_updated_at, \
    approval_status = EXCLUDED.approval_status, created_by = EXCLUDED.created_by, \
    created_by_role = EXCLUDED.created_by_role, reviewed_by = EXCLUDED.reviewed_by, \
    reviewed_at = EXCLUDED.reviewed_at, review_notes = EXCLUDED.review_notes, \
    stroke_weight = EXCLUDED.stroke_weight, fill_opacity = EXCLUDED.fill_opacity, \
    tool = EXCLUDED.tool, updated_at = EXCLUDED.updated_at";

type RowQuery<'q> = QueryAs<'q, Postgres, DrawingRow, PgArguments>;

/// Bind all 40 columns of `row` in [`COLUMNS`] order.
fn bind_row<'q>(query: RowQuery<'q>, row: &'q DrawingRow) -> RowQuery<'q> {
    query
        .bind(&row.id)
        .bind(&row.kind)
        .bind(&row.coordinates)
        .bind(&row.marker_position)
        .bind(&row.element_type)
        .bind(&row.linked_entity_id)
        .bind(&row.name)
        .bind(&row.color)
        .bind(&row.farm)
        .bind(&row.description)
        .bind(&row.status)
        .bind(row.last_updated)
        .bind(&row.category)
        .bind(&row.privacy)
        .bind(row.cfs)
        .bind(row.order_amount)
        .bind(&row.notes)
        .bind(&row.files)
        .bind(&row.contact_name)
        .bind(&row.contact_phone)
        .bind(&row.contact_email)
        .bind(&row.contact_role)
        .bind(&row.contact_privacy)
        .bind(&row.issue_id)
        .bind(&row.issue_description)
        .bind(&row.issue_created_by)
        .bind(&row.issue_created_by_role)
        .bind(row.issue_created_at)
        .bind(row.issue_updated_at)
        .bind(&row.approval_status)
        .bind(&row.created_by)
        .bind(&row.created_by_role)
        .bind(&row.reviewed_by)
        .bind(row.reviewed_at)
        .bind(&row.review_notes)
        .bind(row.stroke_weight)
        .bind(row.fill_opacity)
        .bind(&row.tool)
        .bind(row.created_at)
        .bind(row.updated_at)
}

fn to_row(drawing: &Drawing) -> Result<DrawingRow, sqlx::Error> {
    DrawingRow::try_from(drawing).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Provides CRUD, approval and issue operations for drawings.
pub struct DrawingRepo;

impl DrawingRepo {
    /// List every drawing, oldest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Drawing>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM drawings ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query_as::<_, DrawingRow>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Drawing::from).collect())
    }

    /// Find a drawing by its ID.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Drawing>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM drawings WHERE id = $1");
        let row = sqlx::query_as::<_, DrawingRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Drawing::from))
    }

    /// Insert a drawing, or overwrite the stored one with the same ID.
    /// `created_at` of an existing row is preserved.
    pub async fn upsert(pool: &PgPool, drawing: &Drawing) -> Result<Drawing, sqlx::Error> {
        let row = to_row(drawing)?;
        let query = format!(
            "INSERT INTO drawings ({COLUMNS}) VALUES ({PLACEHOLDERS})
             ON CONFLICT (id) DO UPDATE SET {UPSERT_SET}
             RETURNING {COLUMNS}"
        );
        let saved = bind_row(sqlx::query_as::<_, DrawingRow>(&query), &row)
            .fetch_one(pool)
            .await?;
        Ok(saved.into())
    }

    /// Upsert a batch atomically. Returns the number of drawings written.
    pub async fn save_many(pool: &PgPool, drawings: &[Drawing]) -> Result<usize, sqlx::Error> {
        let rows = drawings.iter().map(to_row).collect::<Result<Vec<_>, _>>()?;
        let query = format!(
            "INSERT INTO drawings ({COLUMNS}) VALUES ({PLACEHOLDERS})
             ON CONFLICT (id) DO UPDATE SET {UPSERT_SET}
             RETURNING {COLUMNS}"
        );

        let mut tx = pool.begin().await?;
        for row in &rows {
            bind_row(sqlx::query_as::<_, DrawingRow>(&query), row)
                .fetch_one(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(rows.len())
    }

    /// Overwrite an existing drawing. Returns `None` if the ID is unknown.
    pub async fn update(pool: &PgPool, drawing: &Drawing) -> Result<Option<Drawing>, sqlx::Error> {
        let row = to_row(drawing)?;
        // `id` is $1 and the WHERE key; every other column is reassigned from
        // its positional parameter.
        let query = format!(
            "UPDATE drawings SET ({COLUMNS}) = ({PLACEHOLDERS})
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = bind_row(sqlx::query_as::<_, DrawingRow>(&query), &row)
            .fetch_optional(pool)
            .await?;
        Ok(updated.map(Drawing::from))
    }

    /// Delete a drawing. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM drawings WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every drawing. Returns the number removed.
    pub async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM drawings").execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// List drawings in one approval state, oldest first.
    pub async fn list_by_approval(
        pool: &PgPool,
        status: ApprovalStatus,
    ) -> Result<Vec<Drawing>, sqlx::Error> {
        // Rows written before approval tracking have NULL and count as pending.
        let query = format!(
            "SELECT {COLUMNS} FROM drawings
             WHERE COALESCE(approval_status, 'pending') = $1
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, DrawingRow>(&query)
            .bind(status.as_str())
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Drawing::from).collect())
    }

    /// Count drawings, optionally only those in `status`.
    pub async fn count(pool: &PgPool, status: Option<ApprovalStatus>) -> Result<i64, sqlx::Error> {
        match status {
            Some(status) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM drawings
                     WHERE COALESCE(approval_status, 'pending') = $1",
                )
                .bind(status.as_str())
                .fetch_one(pool)
                .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM drawings")
                    .fetch_one(pool)
                    .await
            }
        }
    }

    /// Drawings whose privacy settings admit `role`.
    ///
    /// Privacy is stored as JSON text, so the filter runs after decoding.
    pub async fn list_by_role(pool: &PgPool, role: Role) -> Result<Vec<Drawing>, sqlx::Error> {
        let drawings = Self::list_all(pool).await?;
        Ok(drawings
            .into_iter()
            .filter(|d| privacy::can_access(d.privacy.as_ref(), role))
            .collect())
    }

    /// Record a review decision. Returns `None` if the ID is unknown.
    pub async fn set_approval(
        pool: &PgPool,
        id: &str,
        status: ApprovalStatus,
        reviewed_by: &str,
        review_notes: Option<&str>,
        now: Timestamp,
    ) -> Result<Option<Drawing>, sqlx::Error> {
        let query = format!(
            "UPDATE drawings
             SET approval_status = $2, reviewed_by = $3, reviewed_at = $4,
                 review_notes = $5, updated_at = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DrawingRow>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(reviewed_by)
            .bind(now)
            .bind(review_notes)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Drawing::from))
    }

    /// Open or replace the issue on a drawing.
    pub async fn set_issue(
        pool: &PgPool,
        id: &str,
        issue: &Issue,
        now: Timestamp,
    ) -> Result<Option<Drawing>, sqlx::Error> {
        let query = format!(
            "UPDATE drawings
             SET issue_id = $2, issue_description = $3, issue_created_by = $4,
                 issue_created_by_role = $5, issue_created_at = $6, issue_updated_at = $7,
                 updated_at = $8
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DrawingRow>(&query)
            .bind(id)
            .bind(&issue.id)
            .bind(&issue.description)
            .bind(&issue.created_by)
            .bind(issue.created_by_role.map(|r| r.as_str()))
            .bind(issue.created_at)
            .bind(issue.updated_at)
            .bind(now)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Drawing::from))
    }

    /// Clear the issue on a drawing. Returns `None` if the ID is unknown.
    pub async fn clear_issue(
        pool: &PgPool,
        id: &str,
        now: Timestamp,
    ) -> Result<Option<Drawing>, sqlx::Error> {
        let query = format!(
            "UPDATE drawings
             SET issue_id = NULL, issue_description = NULL, issue_created_by = NULL,
                 issue_created_by_role = NULL, issue_created_at = NULL,
                 issue_updated_at = NULL,
                 updated_at = CASE WHEN issue_id IS NULL THEN updated_at ELSE $2 END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DrawingRow>(&query)
            .bind(id)
            .bind(now)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Drawing::from))
    }
}
