//! Viewer roles.
//!
//! Wire names match what the map front-end sends (`"User"`, `"Ditch Rider"`,
//! `"Admin"`). Parsing is lenient about case and separators so the same
//! values work in headers and query strings (`ditch_rider`, `ditch-rider`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_USER: &str = "User";
pub const ROLE_DITCH_RIDER: &str = "Ditch Rider";
pub const ROLE_ADMIN: &str = "Admin";

const VALID_ROLES: &[&str] = &[ROLE_USER, ROLE_DITCH_RIDER, ROLE_ADMIN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "User")]
    User,
    #[serde(rename = "Ditch Rider", alias = "ditch_rider", alias = "ditchRider")]
    DitchRider,
    #[serde(rename = "Admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => ROLE_USER,
            Self::DitchRider => ROLE_DITCH_RIDER,
            Self::Admin => ROLE_ADMIN,
        }
    }

    /// Admins are the only privileged creators: their drawings skip review.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match folded.as_str() {
            "user" | "users" => Ok(Self::User),
            "ditchrider" | "ditchriders" => Ok(Self::DitchRider),
            "admin" | "admins" => Ok(Self::Admin),
            _ => Err(CoreError::Validation(format!(
                "Invalid role '{s}'. Must be one of: {}",
                VALID_ROLES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("User".parse::<Role>().unwrap(), Role::User);
        assert_eq!("Ditch Rider".parse::<Role>().unwrap(), Role::DitchRider);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn parses_header_friendly_forms() {
        assert_eq!("ditch_rider".parse::<Role>().unwrap(), Role::DitchRider);
        assert_eq!("ditch-rider".parse::<Role>().unwrap(), Role::DitchRider);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn unknown_role_rejected() {
        let err = "Moderator".parse::<Role>().unwrap_err();
        assert!(err.to_string().contains("Invalid role"));
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&Role::DitchRider).unwrap();
        assert_eq!(json, "\"Ditch Rider\"");
        let back: Role = serde_json::from_str("\"Ditch Rider\"").unwrap();
        assert_eq!(back, Role::DitchRider);
    }

    #[test]
    fn only_admin_is_privileged() {
        assert!(Role::Admin.is_privileged());
        assert!(!Role::DitchRider.is_privileged());
        assert!(!Role::User.is_privileged());
    }
}
