//! Role-based visibility of drawings and their contact details.
//!
//! Visibility is additive: a viewer sees a drawing when ANY grant matches.
//! There is no deny list. Admins see everything regardless of the stored
//! `admins` flag, which is normalized to `true` on write anyway.

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Per-role grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleFlags {
    pub users: bool,
    pub ditch_riders: bool,
    #[serde(default = "always_true")]
    pub admins: bool,
}

fn always_true() -> bool {
    true
}

impl Default for RoleFlags {
    fn default() -> Self {
        Self {
            users: true,
            ditch_riders: true,
            admins: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    #[serde(default)]
    pub roles: RoleFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_users: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_entity: Option<bool>,
}

impl PrivacySettings {
    /// Copy with the admin grant forced on. Applied before every write.
    pub fn normalized(mut self) -> Self {
        self.roles.admins = true;
        self
    }

    fn grants_role(&self, role: Role) -> bool {
        match role {
            Role::Admin => true,
            Role::DitchRider => self.roles.ditch_riders,
            Role::User => self.roles.users,
        }
    }
}

/// Whether `role` may see something guarded by `privacy`.
///
/// Missing settings mean public. Admins always pass.
pub fn can_access(privacy: Option<&PrivacySettings>, role: Role) -> bool {
    privacy.map_or(true, |p| p.grants_role(role))
}

/// The party asking to see a drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
    pub role: Role,
    /// Linked entity the viewer acts for, if any (e.g. the rider of `ride-1`).
    pub entity_id: Option<String>,
}

impl Viewer {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            entity_id: None,
        }
    }

    pub fn acting_for(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }
}

/// Full visibility check: role grant, named user, or linked-entity grant.
pub fn can_view(
    privacy: Option<&PrivacySettings>,
    viewer: &Viewer,
    linked_entity_id: Option<&str>,
) -> bool {
    let Some(p) = privacy else {
        return true;
    };

    if p.grants_role(viewer.role) {
        return true;
    }

    let named = p
        .specific_users
        .as_ref()
        .is_some_and(|users| users.iter().any(|u| u == &viewer.id));
    if named {
        return true;
    }

    p.linked_entity == Some(true)
        && matches!(
            (linked_entity_id, viewer.entity_id.as_deref()),
            (Some(drawing_entity), Some(viewer_entity)) if drawing_entity == viewer_entity
        )
}

/// Short label describing who can see something.
pub fn privacy_display(privacy: Option<&PrivacySettings>) -> String {
    let Some(p) = privacy else {
        return "All users".to_string();
    };

    let mut allowed = Vec::with_capacity(3);
    if p.roles.users {
        allowed.push("Users");
    }
    if p.roles.ditch_riders {
        allowed.push("Ditch Riders");
    }
    if p.roles.admins {
        allowed.push("Admins");
    }

    match allowed.len() {
        0 => "Admins only".to_string(),
        3 => "All users".to_string(),
        _ => allowed.join(" + "),
    }
}
