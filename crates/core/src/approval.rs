//! Review state of a drawing.
//!
//! The state is a flat tri-state. Any status may move to any other status;
//! callers decide what is allowed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

const VALID_STATUSES: &[&str] = &["pending", "approved", "rejected"];

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Status a new drawing starts in. Admin-created drawings skip review.
    pub fn initial_for(role: Role) -> Self {
        if role.is_privileged() {
            Self::Approved
        } else {
            Self::Pending
        }
    }

    /// Decode a stored value. Unknown or missing values fall back to
    /// `Pending` with a warning.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(str::parse::<Self>) {
            Some(Ok(status)) => status,
            Some(Err(_)) => {
                tracing::warn!(value = ?value, "Unknown approval status, treating as pending");
                Self::Pending
            }
            None => Self::Pending,
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(CoreError::Validation(format!(
                "Invalid approval status '{s}'. Must be one of: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
    /// Send a reviewed drawing back to the queue.
    Reopen,
}

impl ReviewAction {
    pub fn target_status(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
            Self::Reopen => ApprovalStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_creations_start_approved() {
        assert_eq!(ApprovalStatus::initial_for(Role::Admin), ApprovalStatus::Approved);
    }

    #[test]
    fn other_creations_start_pending() {
        assert_eq!(ApprovalStatus::initial_for(Role::User), ApprovalStatus::Pending);
        assert_eq!(
            ApprovalStatus::initial_for(Role::DitchRider),
            ApprovalStatus::Pending
        );
    }

    #[test]
    fn stored_values_decode_leniently() {
        assert_eq!(ApprovalStatus::from_stored(Some("approved")), ApprovalStatus::Approved);
        assert_eq!(ApprovalStatus::from_stored(Some("archived")), ApprovalStatus::Pending);
        assert_eq!(ApprovalStatus::from_stored(None), ApprovalStatus::Pending);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("Approved".parse::<ApprovalStatus>().is_err());
    }

    #[test]
    fn actions_map_to_statuses() {
        assert_eq!(ReviewAction::Approve.target_status(), ApprovalStatus::Approved);
        assert_eq!(ReviewAction::Reject.target_status(), ApprovalStatus::Rejected);
        assert_eq!(ReviewAction::Reopen.target_status(), ApprovalStatus::Pending);
    }

    #[test]
    fn action_wire_names() {
        let a: ReviewAction = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(a, ReviewAction::Reject);
    }
}
