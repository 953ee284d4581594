//! In-memory drawing store.
//!
//! An insertion-ordered keyed collection holding the optimistic local state
//! of a session. Mutations apply immediately and never block on storage; see
//! [`crate::session`] for the write-behind side.

use indexmap::IndexMap;

use crate::approval::ApprovalStatus;
use crate::drawing::{Drawing, DrawingPatch, Issue};
use crate::error::CoreError;
use crate::privacy::{self, Viewer};
use crate::roles::Role;
use crate::types::{RecordId, Timestamp};

#[derive(Debug, Clone, Default)]
pub struct DrawingStore {
    drawings: IndexMap<RecordId, Drawing>,
}

impl DrawingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loaded drawings. Later duplicates replace earlier ones.
    pub fn from_drawings(drawings: impl IntoIterator<Item = Drawing>) -> Self {
        Self {
            drawings: drawings.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Drawing> {
        self.drawings.get(id)
    }

    /// All drawings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Drawing> {
        self.drawings.values()
    }

    /// Insert a new drawing. An existing id is a conflict.
    pub fn create(&mut self, drawing: Drawing) -> Result<&Drawing, CoreError> {
        match self.drawings.entry(drawing.id.clone()) {
            indexmap::map::Entry::Occupied(_) => Err(CoreError::Conflict(format!(
                "Drawing with id {} already exists",
                drawing.id
            ))),
            indexmap::map::Entry::Vacant(slot) => Ok(slot.insert(drawing)),
        }
    }

    /// Insert or replace by id, keeping the original position on replace.
    /// Returns the replaced drawing.
    pub fn upsert(&mut self, drawing: Drawing) -> Option<Drawing> {
        self.drawings.insert(drawing.id.clone(), drawing)
    }

    /// Upsert every drawing. Returns how many were written.
    pub fn save_many(&mut self, drawings: impl IntoIterator<Item = Drawing>) -> usize {
        let mut written = 0;
        for drawing in drawings {
            self.upsert(drawing);
            written += 1;
        }
        written
    }

    /// Merge `patch` into the drawing with `id`.
    ///
    /// `Ok(None)` when the id is unknown; the collection is left unchanged.
    pub fn update(
        &mut self,
        id: &str,
        patch: DrawingPatch,
        now: Timestamp,
    ) -> Result<Option<&Drawing>, CoreError> {
        let Some(drawing) = self.drawings.get_mut(id) else {
            return Ok(None);
        };
        patch.apply(drawing, now)?;
        Ok(Some(drawing))
    }

    /// Remove a drawing, keeping the order of the rest.
    pub fn delete(&mut self, id: &str) -> Option<Drawing> {
        self.drawings.shift_remove(id)
    }

    /// Remove everything. Returns how many drawings were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.drawings.len();
        self.drawings.clear();
        count
    }

    /// Record a review decision. Any status may move to any other.
    pub fn set_approval(
        &mut self,
        id: &str,
        status: ApprovalStatus,
        reviewer: &str,
        notes: Option<String>,
        now: Timestamp,
    ) -> Option<&Drawing> {
        let drawing = self.drawings.get_mut(id)?;
        drawing.apply_review(status, reviewer, notes, now);
        Some(drawing)
    }

    pub fn list_by_approval(&self, status: ApprovalStatus) -> Vec<&Drawing> {
        self.iter().filter(|d| d.approval_status == status).collect()
    }

    /// Number of drawings, optionally only those in `status`.
    pub fn count(&self, status: Option<ApprovalStatus>) -> usize {
        match status {
            Some(status) => self.iter().filter(|d| d.approval_status == status).count(),
            None => self.len(),
        }
    }

    /// Drawings whose privacy settings admit `role`.
    pub fn list_by_role(&self, role: Role) -> Vec<&Drawing> {
        self.iter()
            .filter(|d| privacy::can_access(d.privacy.as_ref(), role))
            .collect()
    }

    /// Drawings visible to a specific viewer (role, named-user and linked-entity
    /// grants).
    pub fn list_visible_to(&self, viewer: &Viewer) -> Vec<&Drawing> {
        self.iter().filter(|d| d.visible_to(viewer)).collect()
    }

    pub fn report_issue(&mut self, id: &str, issue: Issue, now: Timestamp) -> Option<&Drawing> {
        let drawing = self.drawings.get_mut(id)?;
        drawing.set_issue(issue, now);
        Some(drawing)
    }

    pub fn resolve_issue(&mut self, id: &str, now: Timestamp) -> Option<&Drawing> {
        let drawing = self.drawings.get_mut(id)?;
        drawing.clear_issue(now);
        Some(drawing)
    }
}
