//! Flat `drawings` row and its conversion to the domain [`Drawing`].

use fieldmark_core::approval::ApprovalStatus;
use fieldmark_core::drawing::{Drawing, DrawingProperties, Issue, Tool};
use fieldmark_core::geometry::{self, Coordinates, GeometryKind, RawCoordinates};
use fieldmark_core::roles::Role;
use fieldmark_core::types::Timestamp;
use sqlx::FromRow;

use super::{decode_enum, decode_json, encode_enum};

/// A row from the `drawings` table.
#[derive(Debug, Clone, FromRow)]
pub struct DrawingRow {
    pub id: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub coordinates: String,
    pub marker_position: Option<String>,
    pub element_type: Option<String>,
    pub linked_entity_id: Option<String>,
    pub name: String,
    pub color: String,
    pub farm: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub last_updated: Option<Timestamp>,
    pub category: Option<String>,
    pub privacy: Option<String>,
    pub cfs: Option<f64>,
    pub order_amount: Option<f64>,
    pub notes: Option<String>,
    pub files: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub contact_role: Option<String>,
    pub contact_privacy: Option<String>,
    pub issue_id: Option<String>,
    pub issue_description: Option<String>,
    pub issue_created_by: Option<String>,
    pub issue_created_by_role: Option<String>,
    pub issue_created_at: Option<Timestamp>,
    pub issue_updated_at: Option<Timestamp>,
    pub approval_status: Option<String>,
    pub created_by: Option<String>,
    pub created_by_role: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<Timestamp>,
    pub review_notes: Option<String>,
    pub stroke_weight: f64,
    pub fill_opacity: Option<f64>,
    pub tool: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<&Drawing> for DrawingRow {
    type Error = serde_json::Error;

    fn try_from(d: &Drawing) -> Result<Self, Self::Error> {
        Ok(Self {
            id: d.id.clone(),
            kind: d.kind.as_str().to_string(),
            coordinates: serde_json::to_string(&d.coordinates)?,
            marker_position: d.marker_position.map(|m| serde_json::to_string(&m)).transpose()?,
            element_type: d.element_type.map(|t| t.as_str().to_string()),
            linked_entity_id: d.linked_entity_id.clone(),
            name: d.name.clone(),
            color: d.color.clone(),
            farm: d.farm.clone(),
            description: d.description.clone(),
            status: d.status.as_ref().map(encode_enum).transpose()?,
            last_updated: d.last_updated,
            category: d.category.as_ref().map(encode_enum).transpose()?,
            privacy: d.privacy.as_ref().map(serde_json::to_string).transpose()?,
            cfs: d.cfs,
            order_amount: d.order,
            notes: d.notes.clone(),
            files: if d.files.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&d.files)?)
            },
            contact_name: d.contact_name.clone(),
            contact_phone: d.contact_phone.clone(),
            contact_email: d.contact_email.clone(),
            contact_role: d.contact_role.clone(),
            contact_privacy: d
                .contact_privacy
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            issue_id: d.issue.as_ref().map(|i| i.id.clone()),
            issue_description: d.issue.as_ref().map(|i| i.description.clone()),
            issue_created_by: d.issue.as_ref().and_then(|i| i.created_by.clone()),
            issue_created_by_role: d
                .issue
                .as_ref()
                .and_then(|i| i.created_by_role)
                .map(|r| r.as_str().to_string()),
            issue_created_at: d.issue.as_ref().map(|i| i.created_at),
            issue_updated_at: d.issue.as_ref().map(|i| i.updated_at),
            approval_status: Some(d.approval_status.as_str().to_string()),
            created_by: d.created_by.clone(),
            created_by_role: d.created_by_role.map(|r| r.as_str().to_string()),
            reviewed_by: d.reviewed_by.clone(),
            reviewed_at: d.reviewed_at,
            review_notes: d.review_notes.clone(),
            stroke_weight: d.properties.stroke_weight,
            fill_opacity: d.properties.fill_opacity,
            tool: encode_enum(&d.properties.tool)?,
            created_at: d.created_at,
            updated_at: d.updated_at,
        })
    }
}

impl From<DrawingRow> for Drawing {
    /// Decoding never fails: unreadable columns are logged and defaulted so
    /// one bad row cannot hide the rest of the map.
    fn from(row: DrawingRow) -> Self {
        let id = row.id;

        let coordinates_raw: Option<RawCoordinates> =
            decode_json(Some(&row.coordinates), "coordinates", &id);

        let kind = row.kind.parse::<GeometryKind>().unwrap_or_else(|_| {
            let guess = match &coordinates_raw {
                Some(RawCoordinates::Pair(_)) => GeometryKind::Point,
                _ => GeometryKind::Polyline,
            };
            tracing::warn!(id = %id, value = %row.kind, fallback = %guess, "Unknown geometry type");
            guess
        });

        let coordinates = coordinates_raw
            .and_then(|raw| match geometry::canonicalize(kind, raw) {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Unusable stored coordinates");
                    None
                }
            })
            .unwrap_or_else(|| Coordinates::Path(Vec::new()));

        let marker_position = decode_json::<RawCoordinates>(
            row.marker_position.as_deref(),
            "marker_position",
            &id,
        )
        .and_then(|raw| geometry::canonicalize(GeometryKind::Point, raw).ok())
        .map(|c| c.vertices()[0]);

        let issue = row.issue_id.map(|issue_id| Issue {
            id: issue_id,
            description: row.issue_description.unwrap_or_default(),
            created_by: row.issue_created_by,
            created_by_role: row
                .issue_created_by_role
                .as_deref()
                .and_then(|r| r.parse::<Role>().ok()),
            created_at: row.issue_created_at.unwrap_or(row.created_at),
            updated_at: row
                .issue_updated_at
                .or(row.issue_created_at)
                .unwrap_or(row.updated_at),
        });

        let tool = decode_enum::<Tool>(Some(&row.tool), "tool", &id).unwrap_or_default();

        Drawing {
            kind,
            coordinates,
            marker_position,
            element_type: decode_enum(row.element_type.as_deref(), "element_type", &id),
            linked_entity_id: row.linked_entity_id,
            name: row.name,
            color: row.color,
            farm: row.farm,
            description: row.description,
            status: decode_enum(row.status.as_deref(), "status", &id),
            last_updated: row.last_updated,
            category: decode_enum(row.category.as_deref(), "category", &id),
            privacy: decode_json(row.privacy.as_deref(), "privacy", &id),
            cfs: row.cfs,
            order: row.order_amount,
            notes: row.notes,
            files: decode_json(row.files.as_deref(), "files", &id).unwrap_or_default(),
            contact_name: row.contact_name,
            contact_phone: row.contact_phone,
            contact_email: row.contact_email,
            contact_role: row.contact_role,
            contact_privacy: decode_json(row.contact_privacy.as_deref(), "contact_privacy", &id),
            issue,
            approval_status: ApprovalStatus::from_stored(row.approval_status.as_deref()),
            created_by: row.created_by,
            created_by_role: row
                .created_by_role
                .as_deref()
                .and_then(|r| r.parse::<Role>().ok()),
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            review_notes: row.review_notes,
            properties: DrawingProperties {
                stroke_weight: row.stroke_weight,
                fill_opacity: row.fill_opacity,
                tool,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmark_core::dates;
    use fieldmark_core::drawing::DrawingInput;
    use fieldmark_core::privacy::Viewer;
    use serde_json::json;

    fn sample() -> Drawing {
        let input: DrawingInput = serde_json::from_value(json!({
            "id": "d-1",
            "type": "polygon",
            "coordinates": [[44.0, -114.0], [44.1, -114.0], [44.1, -114.1]],
            "name": "North field",
            "status": "active",
            "category": "infrastructure",
            "privacy": {"roles": {"users": false, "ditchRiders": true}},
            "files": [{"id": "f1", "name": "a.pdf", "type": "file", "url": "https://x/a.pdf"}],
            "issue": {"id": "i1", "description": "Broken gate"},
            "properties": {"strokeWeight": 2, "fillOpacity": 0.4, "tool": "area"}
        }))
        .unwrap();
        input
            .into_drawing(&Viewer::new("u1", Role::DitchRider), dates::now())
            .unwrap()
    }

    #[test]
    fn row_round_trip_preserves_drawing() {
        let drawing = sample();
        let row = DrawingRow::try_from(&drawing).unwrap();
        assert_eq!(row.kind, "polygon");
        assert_eq!(row.tool, "area");
        assert_eq!(row.issue_id.as_deref(), Some("i1"));
        assert_eq!(row.created_by_role.as_deref(), Some("Ditch Rider"));

        let back = Drawing::from(row);
        assert_eq!(back, drawing);
    }

    #[test]
    fn malformed_json_columns_are_defaulted() {
        let mut row = DrawingRow::try_from(&sample()).unwrap();
        row.privacy = Some("{not json".into());
        row.files = Some("[1, 2".into());
        row.coordinates = "garbage".into();
        row.approval_status = Some("archived".into());

        let d = Drawing::from(row);

        assert!(d.privacy.is_none());
        assert!(d.files.is_empty());
        assert_eq!(d.coordinates, Coordinates::Path(vec![]));
        assert_eq!(d.approval_status, ApprovalStatus::Pending);
    }

    #[test]
    fn nested_point_in_storage_is_unwrapped() {
        let mut row = DrawingRow::try_from(&sample()).unwrap();
        row.kind = "point".into();
        row.coordinates = "[[44.5,-114.5]]".into();

        let d = Drawing::from(row);

        assert_eq!(d.coordinates, Coordinates::Point([44.5, -114.5]));
    }

    #[test]
    fn empty_files_stored_as_null() {
        let mut drawing = sample();
        drawing.files.clear();
        drawing.privacy = None;
        let row = DrawingRow::try_from(&drawing).unwrap();
        assert!(row.files.is_none());
        assert!(row.privacy.is_none());
    }
}
