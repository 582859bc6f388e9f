//! Core data type definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of a signed-in user.
///
/// The set of known roles is closed. A role string coming from the login
/// flow that matches none of them is kept verbatim in [`Role::Unrecognized`]
/// so it round-trips through storage, and is given the fallback policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Teacher,
    Guidance,
    Student,
    Parent,
    Unrecognized(String),
}

impl Role {
    /// All known roles, in dashboard order
    pub const KNOWN: [Role; 5] = [
        Role::Admin,
        Role::Teacher,
        Role::Guidance,
        Role::Student,
        Role::Parent,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Guidance => "guidance",
            Role::Student => "student",
            Role::Parent => "parent",
            Role::Unrecognized(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Role::Unrecognized(_))
    }

    /// Human readable label for headers and greetings
    pub fn label(&self) -> &str {
        match self {
            Role::Admin => "Administrator",
            Role::Teacher => "Teacher",
            Role::Guidance => "Guidance Counselor",
            Role::Student => "Student",
            Role::Parent => "Parent",
            Role::Unrecognized(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "teacher" => Role::Teacher,
            "guidance" => Role::Guidance,
            "student" => Role::Student,
            "parent" => Role::Parent,
            _ => Role::Unrecognized(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-role session policy: how long a session lives and where the role
/// lands after login. Both live in one entry so a new role cannot be added
/// to one table and forgotten in the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSettings {
    /// Session lifetime in minutes
    pub session_minutes: u32,
    /// Dashboard path for this role
    pub dashboard_path: String,
}

impl RoleSettings {
    pub fn new<S: Into<String>>(session_minutes: u32, dashboard_path: S) -> Self {
        Self {
            session_minutes,
            dashboard_path: dashboard_path.into(),
        }
    }
}

/// Role table keyed by role name, plus the entry used for unknown roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTable {
    pub roles: BTreeMap<String, RoleSettings>,
    pub fallback: RoleSettings,
}

impl Default for RoleTable {
    fn default() -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(
            "admin".to_string(),
            RoleSettings::new(24 * 60, "/admin/dashboard"),
        );
        roles.insert(
            "teacher".to_string(),
            RoleSettings::new(24 * 60, "/teacher/dashboard"),
        );
        roles.insert(
            "guidance".to_string(),
            RoleSettings::new(24 * 60, "/guidance/dashboard"),
        );
        roles.insert(
            "student".to_string(),
            RoleSettings::new(8 * 60, "/student/dashboard"),
        );
        roles.insert(
            "parent".to_string(),
            RoleSettings::new(4 * 60, "/parent/dashboard"),
        );

        Self {
            roles,
            // Unknown roles get the student policy
            fallback: RoleSettings::new(8 * 60, "/student/dashboard"),
        }
    }
}

impl RoleTable {
    /// Settings for a role, falling back for unknown or unlisted roles
    pub fn settings_for(&self, role: &Role) -> &RoleSettings {
        self.roles.get(role.as_str()).unwrap_or(&self.fallback)
    }
}
