//! The drawing model and its normalization rules.
//!
//! [`DrawingInput`] is what clients send: loose, partially filled, possibly in
//! GeoJSON axis order. [`DrawingInput::into_drawing`] turns it into a
//! [`Drawing`], the canonical record held by the store and the database.
//! [`DrawingPatch`] is the partial-update counterpart.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::approval::ApprovalStatus;
use crate::centroid;
use crate::dates;
use crate::error::CoreError;
use crate::geometry::{self, CoordinateOrder, Coordinates, GeometryKind, RawCoordinates};
use crate::privacy::{self, PrivacySettings, Viewer};
use crate::roles::Role;
use crate::types::{CoordPair, RecordId, Timestamp};

/// Length of the random suffix of generated ids.
const ID_SUFFIX_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Default stroke weight when a drawing carries no properties.
pub const DEFAULT_STROKE_WEIGHT: f64 = 3.0;

/// Generate a drawing id: `drawing_<epoch-millis>_<9 base36 chars>`.
pub fn generate_id(now: Timestamp) -> RecordId {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("drawing_{}_{suffix}", now.timestamp_millis())
}

/// Marker color for a creator role when none is given.
pub fn default_color(role: Role) -> &'static str {
    match role {
        Role::Admin => "red",
        _ => "blue",
    }
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Secondary classification of a drawing, independent of its geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Ride,
    Canal,
    Headgate,
    Meter,
    Pump,
    Pivot,
    Land,
    Hazard,
    Maintenance,
    Custom,
}

const VALID_ELEMENT_TYPES: &[&str] = &[
    "ride",
    "canal",
    "headgate",
    "meter",
    "pump",
    "pivot",
    "land",
    "hazard",
    "maintenance",
    "custom",
];

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ride => "ride",
            Self::Canal => "canal",
            Self::Headgate => "headgate",
            Self::Meter => "meter",
            Self::Pump => "pump",
            Self::Pivot => "pivot",
            Self::Land => "land",
            Self::Hazard => "hazard",
            Self::Maintenance => "maintenance",
            Self::Custom => "custom",
        }
    }

    /// Whether reference records exist for this type (see `entity`).
    pub fn has_records(&self) -> bool {
        !matches!(self, Self::Hazard | Self::Maintenance | Self::Custom)
    }
}

impl FromStr for ElementType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ride" => Ok(Self::Ride),
            "canal" => Ok(Self::Canal),
            "headgate" => Ok(Self::Headgate),
            "meter" => Ok(Self::Meter),
            "pump" => Ok(Self::Pump),
            "pivot" => Ok(Self::Pivot),
            "land" => Ok(Self::Land),
            "hazard" => Ok(Self::Hazard),
            "maintenance" => Ok(Self::Maintenance),
            "custom" => Ok(Self::Custom),
            _ => Err(CoreError::Validation(format!(
                "Invalid element type '{s}'. Must be one of: {}",
                VALID_ELEMENT_TYPES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingStatus {
    Active,
    Inactive,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Infrastructure,
    Monitoring,
    Other,
}

/// Tool the drawing was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Line,
    /// Freehand path.
    Draw,
    /// Freehand closed area.
    Area,
    #[default]
    Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingProperties {
    pub stroke_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(default)]
    pub tool: Tool,
}

impl Default for DrawingProperties {
    fn default() -> Self {
        Self {
            stroke_weight: DEFAULT_STROKE_WEIGHT,
            fill_opacity: None,
            tool: Tool::Point,
        }
    }
}

// ---------------------------------------------------------------------------
// Attachments and issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    File,
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub created_at: Timestamp,
}

/// An attachment as sent by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInput {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AttachmentKind>,
    pub url: Option<String>,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
    pub created_at: Option<Value>,
}

impl FileInput {
    /// Validate one attachment. `blob:` URLs only live in the uploading
    /// browser and are dropped, as are entries without id or name.
    fn into_attachment(self, now: Timestamp) -> Option<FileAttachment> {
        let url = self.url.unwrap_or_default();
        if url.starts_with("blob:") {
            tracing::warn!(name = ?self.name, "Skipping attachment with blob URL");
            return None;
        }
        let (Some(id), Some(name)) = (self.id, self.name) else {
            tracing::warn!(url = %url, "Skipping attachment without id or name");
            return None;
        };
        if id.is_empty() || name.is_empty() {
            tracing::warn!(url = %url, "Skipping attachment without id or name");
            return None;
        }
        Some(FileAttachment {
            id,
            name,
            kind: self.kind.unwrap_or(AttachmentKind::Link),
            url,
            size: self.size,
            mime_type: self.mime_type,
            created_at: dates::parse_lenient(self.created_at.as_ref(), "files.createdAt", now),
        })
    }
}

fn clean_files(files: Vec<FileInput>, now: Timestamp) -> Vec<FileAttachment> {
    files
        .into_iter()
        .filter_map(|f| f.into_attachment(now))
        .collect()
}

/// The single open issue on a drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_role: Option<Role>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for reporting an issue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueInput {
    pub id: Option<String>,
    pub description: String,
    pub created_by: Option<String>,
    pub created_by_role: Option<Role>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

impl IssueInput {
    pub fn into_issue(self, actor: &Viewer, now: Timestamp) -> Result<Issue, CoreError> {
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(CoreError::Validation(
                "issue description must not be empty".to_string(),
            ));
        }
        Ok(Issue {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("issue_{}", now.timestamp_millis())),
            description,
            created_by: self.created_by.or_else(|| Some(actor.id.clone())),
            created_by_role: self.created_by_role.or(Some(actor.role)),
            created_at: dates::parse_lenient(self.created_at.as_ref(), "issue.createdAt", now),
            updated_at: dates::parse_lenient(self.updated_at.as_ref(), "issue.updatedAt", now),
        })
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// A user-drawn shape with its metadata. Coordinates are in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub coordinates: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_position: Option<CoordPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_entity_id: Option<String>,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DrawingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy: Option<PrivacySettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_privacy: Option<PrivacySettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    #[serde(default)]
    pub properties: DrawingProperties,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Drawing {
    /// Whether `viewer` may see this drawing at all.
    pub fn visible_to(&self, viewer: &Viewer) -> bool {
        privacy::can_view(
            self.privacy.as_ref(),
            viewer,
            self.linked_entity_id.as_deref(),
        )
    }

    /// Whether `viewer` may see the contact fields.
    pub fn contact_visible_to(&self, viewer: &Viewer) -> bool {
        privacy::can_view(
            self.contact_privacy.as_ref(),
            viewer,
            self.linked_entity_id.as_deref(),
        )
    }

    /// Copy with the contact fields removed when `viewer` may not see them.
    pub fn redacted_for(mut self, viewer: &Viewer) -> Self {
        if !self.contact_visible_to(viewer) {
            self.contact_name = None;
            self.contact_phone = None;
            self.contact_email = None;
            self.contact_role = None;
        }
        self
    }

    /// Anchor for the label: the cached marker, or the bbox midpoint.
    pub fn anchor(&self) -> CoordPair {
        self.marker_position
            .unwrap_or_else(|| centroid::marker_position(self.kind, &self.coordinates))
    }

    /// Record a review decision.
    pub fn apply_review(
        &mut self,
        status: ApprovalStatus,
        reviewer: impl Into<String>,
        notes: Option<String>,
        now: Timestamp,
    ) {
        self.approval_status = status;
        self.reviewed_by = Some(reviewer.into());
        self.reviewed_at = Some(now);
        self.review_notes = notes;
        self.updated_at = now;
    }

    /// Open or replace the issue.
    pub fn set_issue(&mut self, issue: Issue, now: Timestamp) {
        self.issue = Some(issue);
        self.updated_at = now;
    }

    /// Clear the issue. Returns whether there was one.
    pub fn clear_issue(&mut self, now: Timestamp) -> bool {
        let had_issue = self.issue.take().is_some();
        if had_issue {
            self.updated_at = now;
        }
        had_issue
    }

    /// Close freehand areas so they render as filled shapes.
    fn close_freehand_area(&mut self) {
        if self.properties.tool != Tool::Area {
            return;
        }
        if let Coordinates::Path(path) = &mut self.coordinates {
            *path = geometry::close_ring(std::mem::take(path));
        }
    }
}

// ---------------------------------------------------------------------------
// Create input
// ---------------------------------------------------------------------------

/// A drawing as sent by a client for create or upsert.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingInput {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub coordinates: RawCoordinates,
    /// Axis order of `coordinates` and `markerPosition`.
    #[serde(default)]
    pub coordinate_order: CoordinateOrder,
    pub marker_position: Option<RawCoordinates>,
    pub element_type: Option<ElementType>,
    pub linked_entity_id: Option<String>,
    pub name: Option<String>,
    pub color: Option<String>,
    pub farm: Option<String>,
    pub description: Option<String>,
    pub status: Option<DrawingStatus>,
    pub last_updated: Option<Value>,
    pub category: Option<Category>,
    pub privacy: Option<PrivacySettings>,
    pub cfs: Option<f64>,
    pub order: Option<f64>,
    pub notes: Option<String>,
    pub files: Option<Vec<FileInput>>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub contact_role: Option<String>,
    pub contact_privacy: Option<PrivacySettings>,
    pub issue: Option<IssueInput>,
    pub approval_status: Option<ApprovalStatus>,
    pub created_by: Option<String>,
    pub created_by_role: Option<Role>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<Value>,
    pub review_notes: Option<String>,
    pub properties: Option<DrawingProperties>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

impl DrawingInput {
    /// Minimal input for the given geometry, mostly useful in tests and
    /// tooling.
    pub fn new(kind: GeometryKind, coordinates: RawCoordinates, name: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            coordinates,
            coordinate_order: CoordinateOrder::default(),
            marker_position: None,
            element_type: None,
            linked_entity_id: None,
            name: Some(name.into()),
            color: None,
            farm: None,
            description: None,
            status: None,
            last_updated: None,
            category: None,
            privacy: None,
            cfs: None,
            order: None,
            notes: None,
            files: None,
            contact_name: None,
            contact_phone: None,
            contact_email: None,
            contact_role: None,
            contact_privacy: None,
            issue: None,
            approval_status: None,
            created_by: None,
            created_by_role: None,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            properties: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Normalize into a canonical [`Drawing`] created by `actor`.
    ///
    /// - Generates an id when none is given.
    /// - Converts coordinates to display order and closes freehand areas.
    /// - Computes the marker when absent.
    /// - Admin-created drawings start approved and reviewed by their creator;
    ///   everything else starts pending. An explicit `approvalStatus` wins.
    /// - Drops unusable attachments and forces the admin privacy grant.
    pub fn into_drawing(self, actor: &Viewer, now: Timestamp) -> Result<Drawing, CoreError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CoreError::Validation("drawing name is required".to_string()))?;

        let coordinates =
            geometry::to_display_order(self.kind, self.coordinates, self.coordinate_order)?;

        let marker_position = self
            .marker_position
            .map(|raw| {
                geometry::to_display_order(GeometryKind::Point, raw, self.coordinate_order)
            })
            .transpose()?
            .map(|c| c.vertices()[0]);

        let created_by = self.created_by.or_else(|| Some(actor.id.clone()));
        let creator_role = self.created_by_role.unwrap_or(actor.role);

        let approval_status = self
            .approval_status
            .unwrap_or_else(|| ApprovalStatus::initial_for(creator_role));
        let auto_approved = self.approval_status.is_none() && approval_status == ApprovalStatus::Approved;

        let reviewed_at = dates::parse_optional(self.reviewed_at.as_ref(), "reviewedAt")
            .or(auto_approved.then_some(now));
        let reviewed_by = self
            .reviewed_by
            .or_else(|| auto_approved.then(|| actor.id.clone()));

        let issue = self
            .issue
            .map(|i| i.into_issue(actor, now))
            .transpose()?;

        let mut drawing = Drawing {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| generate_id(now)),
            kind: self.kind,
            coordinates,
            marker_position,
            element_type: self.element_type,
            linked_entity_id: self.linked_entity_id,
            name,
            color: self
                .color
                .unwrap_or_else(|| default_color(creator_role).to_string()),
            farm: self.farm,
            description: self.description,
            status: self.status,
            last_updated: dates::parse_optional(self.last_updated.as_ref(), "lastUpdated"),
            category: self.category,
            privacy: self.privacy.map(PrivacySettings::normalized),
            cfs: self.cfs,
            order: self.order,
            notes: self.notes,
            files: clean_files(self.files.unwrap_or_default(), now),
            contact_name: self.contact_name,
            contact_phone: self.contact_phone,
            contact_email: self.contact_email,
            contact_role: self.contact_role,
            contact_privacy: self.contact_privacy.map(PrivacySettings::normalized),
            issue,
            approval_status,
            created_by,
            created_by_role: Some(creator_role),
            reviewed_by,
            reviewed_at,
            review_notes: self.review_notes,
            properties: self.properties.unwrap_or_default(),
            created_at: dates::parse_lenient(self.created_at.as_ref(), "createdAt", now),
            updated_at: dates::parse_lenient(self.updated_at.as_ref(), "updatedAt", now),
        };

        drawing.close_freehand_area();
        if drawing.marker_position.is_none() {
            drawing.marker_position =
                Some(centroid::marker_position(drawing.kind, &drawing.coordinates));
        }

        Ok(drawing)
    }
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Partial update of a drawing. Absent fields are left untouched; an
/// explicit `null` clears an optional field (`Some(None)`).
///
/// Approval state and the issue are changed through their own operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingPatch {
    #[serde(rename = "type")]
    pub kind: Option<GeometryKind>,
    pub coordinates: Option<RawCoordinates>,
    #[serde(default)]
    pub coordinate_order: CoordinateOrder,
    pub marker_position: Option<RawCoordinates>,
    #[serde(default, deserialize_with = "nullable")]
    pub element_type: Option<Option<ElementType>>,
    #[serde(default, deserialize_with = "nullable")]
    pub linked_entity_id: Option<Option<String>>,
    pub name: Option<String>,
    pub color: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub farm: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: Option<Option<DrawingStatus>>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_updated: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<Category>>,
    #[serde(default, deserialize_with = "nullable")]
    pub privacy: Option<Option<PrivacySettings>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cfs: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub order: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    pub files: Option<Vec<FileInput>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_role: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_privacy: Option<Option<PrivacySettings>>,
    pub properties: Option<DrawingProperties>,
}

/// Present-but-null deserializes to `Some(None)`; absence stays `None`
/// through `#[serde(default)]`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl DrawingPatch {
    /// Merge into `drawing` and stamp `updatedAt`.
    ///
    /// Changing the geometry without a new marker recomputes the marker.
    pub fn apply(self, drawing: &mut Drawing, now: Timestamp) -> Result<(), CoreError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(CoreError::Validation(
                    "drawing name must not be empty".to_string(),
                ));
            }
        }

        let kind = self.kind.unwrap_or(drawing.kind);
        let geometry_changed = self.coordinates.is_some() || kind != drawing.kind;

        let coordinates = match self.coordinates {
            Some(raw) => Some(geometry::to_display_order(kind, raw, self.coordinate_order)?),
            None if kind != drawing.kind => Some(geometry::canonicalize(
                kind,
                drawing.coordinates.clone().into(),
            )?),
            None => None,
        };

        let marker_position = self
            .marker_position
            .map(|raw| geometry::to_display_order(GeometryKind::Point, raw, self.coordinate_order))
            .transpose()?
            .map(|c| c.vertices()[0]);

        drawing.kind = kind;
        if let Some(coords) = coordinates {
            drawing.coordinates = coords;
        }
        if let Some(props) = self.properties {
            drawing.properties = props;
        }
        if geometry_changed {
            drawing.close_freehand_area();
        }
        match marker_position {
            Some(marker) => drawing.marker_position = Some(marker),
            None if geometry_changed => {
                drawing.marker_position =
                    Some(centroid::marker_position(drawing.kind, &drawing.coordinates));
            }
            None => {}
        }

        if let Some(v) = self.name {
            drawing.name = v.trim().to_string();
        }
        if let Some(v) = self.element_type {
            drawing.element_type = v;
        }
        if let Some(v) = self.linked_entity_id {
            drawing.linked_entity_id = v;
        }
        if let Some(v) = self.color {
            drawing.color = v;
        }
        if let Some(v) = self.farm {
            drawing.farm = v;
        }
        if let Some(v) = self.description {
            drawing.description = v;
        }
        if let Some(v) = self.status {
            drawing.status = v;
        }
        if let Some(v) = self.last_updated {
            drawing.last_updated = dates::parse_optional(v.as_ref(), "lastUpdated");
        }
        if let Some(v) = self.category {
            drawing.category = v;
        }
        if let Some(v) = self.privacy {
            drawing.privacy = v.map(PrivacySettings::normalized);
        }
        if let Some(v) = self.cfs {
            drawing.cfs = v;
        }
        if let Some(v) = self.order {
            drawing.order = v;
        }
        if let Some(v) = self.notes {
            drawing.notes = v;
        }
        if let Some(files) = self.files {
            drawing.files = clean_files(files, now);
        }
        if let Some(v) = self.contact_name {
            drawing.contact_name = v;
        }
        if let Some(v) = self.contact_phone {
            drawing.contact_phone = v;
        }
        if let Some(v) = self.contact_email {
            drawing.contact_email = v;
        }
        if let Some(v) = self.contact_role {
            drawing.contact_role = v;
        }
        if let Some(v) = self.contact_privacy {
            drawing.contact_privacy = v.map(PrivacySettings::normalized);
        }

        drawing.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A minimal drawing with fixed timestamps.
    pub fn drawing_with(id: &str, kind: GeometryKind, coordinates: Coordinates) -> Drawing {
        let mut input = DrawingInput::new(kind, coordinates.into(), format!("Drawing {id}"));
        input.id = Some(id.to_string());
        let actor = Viewer::new("tester", Role::User);
        input
            .into_drawing(&actor, dates::now())
            .expect("valid test drawing")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn user() -> Viewer {
        Viewer::new("u-1", Role::User)
    }

    fn admin() -> Viewer {
        Viewer::new("a-1", Role::Admin)
    }

    fn input(value: Value) -> DrawingInput {
        serde_json::from_value(value).unwrap()
    }

    // -- ids ------------------------------------------------------------------

    #[test]
    fn generated_id_format() {
        let now = dates::now();
        let id = generate_id(now);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "drawing");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn supplied_id_is_kept() {
        let d = input(json!({"id": "abc", "type": "point", "coordinates": [1, 2], "name": "A"}))
            .into_drawing(&user(), dates::now())
            .unwrap();
        assert_eq!(d.id, "abc");
    }

    // -- approval defaults ----------------------------------------------------

    #[test]
    fn user_creation_is_pending() {
        let d = input(json!({"type": "point", "coordinates": [1, 2], "name": "A"}))
            .into_drawing(&user(), dates::now())
            .unwrap();
        assert_eq!(d.approval_status, ApprovalStatus::Pending);
        assert_eq!(d.created_by.as_deref(), Some("u-1"));
        assert_eq!(d.created_by_role, Some(Role::User));
        assert!(d.reviewed_by.is_none());
        assert!(d.reviewed_at.is_none());
        assert_eq!(d.color, "blue");
    }

    #[test]
    fn admin_creation_is_approved_and_reviewed() {
        let now = dates::now();
        let d = input(json!({"type": "point", "coordinates": [1, 2], "name": "A"}))
            .into_drawing(&admin(), now)
            .unwrap();
        assert_eq!(d.approval_status, ApprovalStatus::Approved);
        assert_eq!(d.reviewed_by.as_deref(), Some("a-1"));
        assert_eq!(d.reviewed_at, Some(now));
        assert_eq!(d.color, "red");
    }

    #[test]
    fn explicit_status_wins() {
        let d = input(json!({
            "type": "point", "coordinates": [1, 2], "name": "A",
            "approvalStatus": "rejected", "reviewedBy": "boss"
        }))
        .into_drawing(&user(), dates::now())
        .unwrap();
        assert_eq!(d.approval_status, ApprovalStatus::Rejected);
        assert_eq!(d.reviewed_by.as_deref(), Some("boss"));
    }

    // -- geometry -------------------------------------------------------------

    #[test]
    fn nested_point_unwrapped_and_marker_set() {
        let d = input(json!({"type": "point", "coordinates": [[44.1, -114.2]], "name": "P"}))
            .into_drawing(&user(), dates::now())
            .unwrap();
        assert_eq!(d.coordinates, Coordinates::Point([44.1, -114.2]));
        assert_eq!(d.marker_position, Some([44.1, -114.2]));
    }

    #[test]
    fn lng_lat_payload_converted() {
        let d = input(json!({
            "type": "line", "coordinates": [[-114.0, 44.0], [-116.0, 46.0]],
            "coordinateOrder": "lngLat", "name": "L"
        }))
        .into_drawing(&user(), dates::now())
        .unwrap();
        assert_eq!(d.coordinates, Coordinates::Path(vec![[44.0, -114.0], [46.0, -116.0]]));
        assert_eq!(d.marker_position, Some([45.0, -115.0]));
    }

    #[test]
    fn freehand_area_is_closed() {
        let d = input(json!({
            "type": "polygon", "coordinates": [[0, 0], [0, 1], [1, 1]], "name": "Field",
            "properties": {"strokeWeight": 2, "tool": "area"}
        }))
        .into_drawing(&user(), dates::now())
        .unwrap();
        assert_eq!(d.coordinates.vertices().len(), 4);
        assert_eq!(d.coordinates.vertices()[3], [0.0, 0.0]);
    }

    #[test]
    fn drawn_polygon_not_closed() {
        let d = input(json!({
            "type": "polygon", "coordinates": [[0, 0], [0, 1], [1, 1]], "name": "Field",
            "properties": {"strokeWeight": 2, "tool": "line"}
        }))
        .into_drawing(&user(), dates::now())
        .unwrap();
        assert_eq!(d.coordinates.vertices().len(), 3);
    }

    #[test]
    fn empty_point_rejected() {
        let err = input(json!({"type": "point", "coordinates": [], "name": "P"}))
            .into_drawing(&user(), dates::now())
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn missing_name_rejected() {
        let err = input(json!({"type": "point", "coordinates": [1, 2]}))
            .into_drawing(&user(), dates::now())
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    // -- normalization --------------------------------------------------------

    #[test]
    fn defaults_applied() {
        let d = input(json!({"type": "point", "coordinates": [1, 2], "name": "A"}))
            .into_drawing(&user(), dates::now())
            .unwrap();
        assert_eq!(d.properties, DrawingProperties::default());
        assert!(d.files.is_empty());
    }

    #[test]
    fn bad_dates_fall_back_to_now() {
        let now = dates::now();
        let d = input(json!({
            "type": "point", "coordinates": [1, 2], "name": "A",
            "createdAt": "yesterday-ish", "updatedAt": 12
        }))
        .into_drawing(&user(), now)
        .unwrap();
        assert_eq!(d.created_at, now);
        assert_ne!(d.updated_at, now);
    }

    #[test]
    fn blob_and_incomplete_files_dropped() {
        let d = input(json!({
            "type": "point", "coordinates": [1, 2], "name": "A",
            "files": [
                {"id": "f1", "name": "map.pdf", "type": "file", "url": "https://x/map.pdf"},
                {"id": "f2", "name": "local.png", "type": "file", "url": "blob:http://localhost/123"},
                {"name": "no-id", "type": "link", "url": "https://x"}
            ]
        }))
        .into_drawing(&user(), dates::now())
        .unwrap();
        assert_eq!(d.files.len(), 1);
        assert_eq!(d.files[0].id, "f1");
    }

    #[test]
    fn privacy_admin_flag_forced() {
        let d = input(json!({
            "type": "point", "coordinates": [1, 2], "name": "A",
            "privacy": {"roles": {"users": false, "ditchRiders": false, "admins": false}}
        }))
        .into_drawing(&user(), dates::now())
        .unwrap();
        assert!(d.privacy.unwrap().roles.admins);
    }

    #[test]
    fn embedded_issue_normalized() {
        let d = input(json!({
            "type": "point", "coordinates": [1, 2], "name": "A",
            "issue": {"id": "i1", "description": "Gate stuck"}
        }))
        .into_drawing(&user(), dates::now())
        .unwrap();
        let issue = d.issue.unwrap();
        assert_eq!(issue.description, "Gate stuck");
        assert_eq!(issue.created_by.as_deref(), Some("u-1"));
    }

    // -- redaction ------------------------------------------------------------

    #[test]
    fn contact_fields_redacted_for_unauthorized_viewer() {
        let d = input(json!({
            "type": "point", "coordinates": [1, 2], "name": "A",
            "contactName": "Jo", "contactPhone": "555",
            "contactPrivacy": {"roles": {"users": false, "ditchRiders": true}}
        }))
        .into_drawing(&admin(), dates::now())
        .unwrap();

        let for_user = d.clone().redacted_for(&user());
        assert!(for_user.contact_name.is_none());
        assert!(for_user.contact_phone.is_none());

        let rider = Viewer::new("r", Role::DitchRider);
        let for_rider = d.redacted_for(&rider);
        assert_eq!(for_rider.contact_name.as_deref(), Some("Jo"));
    }

    // -- patch ----------------------------------------------------------------

    #[test]
    fn patch_merges_and_stamps() {
        let mut d = test_support::drawing_with("d1", GeometryKind::Point, Coordinates::Point([1.0, 2.0]));
        let later = d.updated_at + chrono::Duration::seconds(5);
        let patch: DrawingPatch =
            serde_json::from_value(json!({"name": "Renamed", "notes": "n"})).unwrap();

        patch.apply(&mut d, later).unwrap();

        assert_eq!(d.name, "Renamed");
        assert_eq!(d.notes.as_deref(), Some("n"));
        assert_eq!(d.updated_at, later);
        assert_eq!(d.coordinates, Coordinates::Point([1.0, 2.0]));
    }

    #[test]
    fn patch_geometry_recomputes_marker() {
        let mut d = test_support::drawing_with(
            "d1",
            GeometryKind::Line,
            Coordinates::Path(vec![[0.0, 0.0], [2.0, 2.0]]),
        );
        let patch: DrawingPatch =
            serde_json::from_value(json!({"coordinates": [[0, 0], [4, 8]]})).unwrap();

        patch.apply(&mut d, dates::now()).unwrap();

        assert_eq!(d.marker_position, Some([2.0, 4.0]));
    }

    #[test]
    fn patch_kind_change_recanonicalizes() {
        let mut d = test_support::drawing_with(
            "d1",
            GeometryKind::Line,
            Coordinates::Path(vec![[3.0, 4.0], [5.0, 6.0]]),
        );
        let patch: DrawingPatch = serde_json::from_value(json!({"type": "point"})).unwrap();

        patch.apply(&mut d, dates::now()).unwrap();

        assert_eq!(d.kind, GeometryKind::Point);
        assert_eq!(d.coordinates, Coordinates::Point([3.0, 4.0]));
    }

    #[test]
    fn patch_null_clears_optional_fields() {
        let mut d = test_support::drawing_with("d1", GeometryKind::Point, Coordinates::Point([1.0, 2.0]));
        d.notes = Some("old".into());
        d.linked_entity_id = Some("canal-1".into());
        d.farm = Some("North".into());
        let patch: DrawingPatch = serde_json::from_value(json!({
            "notes": null,
            "linkedEntityId": null,
            "privacy": null
        }))
        .unwrap();

        assert_eq!(patch.notes, Some(None));
        assert_eq!(patch.farm, None);
        patch.apply(&mut d, dates::now()).unwrap();

        assert_eq!(d.notes, None);
        assert_eq!(d.linked_entity_id, None);
        assert_eq!(d.privacy, None);
        assert_eq!(d.farm.as_deref(), Some("North"));
    }

    #[test]
    fn patch_rejects_blank_name() {
        let mut d = test_support::drawing_with("d1", GeometryKind::Point, Coordinates::Point([1.0, 2.0]));
        let before = d.clone();
        let patch: DrawingPatch = serde_json::from_value(json!({"name": "   "})).unwrap();

        assert_matches!(patch.apply(&mut d, dates::now()), Err(CoreError::Validation(_)));
        assert_eq!(d, before);
    }

    // -- serde ----------------------------------------------------------------

    #[test]
    fn wire_format_is_camel_case() {
        let d = test_support::drawing_with("d1", GeometryKind::Point, Coordinates::Point([1.0, 2.0]));
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["type"], "point");
        assert_eq!(v["approvalStatus"], "pending");
        assert_eq!(v["createdByRole"], "User");
        assert_eq!(v["markerPosition"], json!([1.0, 2.0]));
        assert!(v.get("files").is_none());
    }
}
