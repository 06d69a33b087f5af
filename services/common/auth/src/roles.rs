use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Every role a clinic identity can hold. The wire form is the lowercase
/// name (`superadmin`, `centeradmin`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    SuperAdmin,
    CenterAdmin,
    Doctor,
    Receptionist,
    Lab,
    Patient,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::CenterAdmin,
        Role::Doctor,
        Role::Receptionist,
        Role::Lab,
        Role::Patient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "superadmin",
            Role::CenterAdmin => "centeradmin",
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
            Role::Lab => "lab",
            Role::Patient => "patient",
        }
    }

    /// Every role except superadmin is bound to a single center.
    pub fn requires_center(&self) -> bool {
        !matches!(self, Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "superadmin" | "super_admin" => Ok(Role::SuperAdmin),
            "centeradmin" | "center_admin" => Ok(Role::CenterAdmin),
            "doctor" => Ok(Role::Doctor),
            "receptionist" => Ok(Role::Receptionist),
            "lab" => Ok(Role::Lab),
            "patient" => Ok(Role::Patient),
            other => Err(AuthError::InvalidClaim("role", other.to_string())),
        }
    }
}

pub fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
