//! Shared query parameter types for API handlers.
//!
//! Enum-valued parameters arrive as plain strings and are parsed with the
//! core `FromStr` impls, so an unknown value is a 400 `VALIDATION_ERROR`
//! rather than an extractor rejection.

use fieldmark_core::approval::ApprovalStatus;
use fieldmark_core::error::CoreError;
use fieldmark_core::roles::Role;
use serde::Deserialize;

/// `GET /drawings?role=&status=`.
#[derive(Debug, Default, Deserialize)]
pub struct DrawingListParams {
    /// Keep only drawings whose privacy settings admit this role.
    pub role: Option<String>,
    /// Keep only drawings in this approval state.
    pub status: Option<String>,
}

impl DrawingListParams {
    pub fn role(&self) -> Result<Option<Role>, CoreError> {
        self.role.as_deref().map(str::parse).transpose()
    }

    pub fn status(&self) -> Result<Option<ApprovalStatus>, CoreError> {
        self.status.as_deref().map(str::parse).transpose()
    }
}

/// What `GET /drawings/approval` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalView {
    Count,
    Pending,
}

/// `GET /drawings/approval?action=`.
#[derive(Debug, Default, Deserialize)]
pub struct ApprovalQuery {
    pub action: Option<String>,
}

impl ApprovalQuery {
    /// Unknown actions fall back to the combined view.
    pub fn view(&self) -> Option<ApprovalView> {
        match self.action.as_deref()? {
            "count" => Some(ApprovalView::Count),
            "pending" => Some(ApprovalView::Pending),
            _ => None,
        }
    }
}
