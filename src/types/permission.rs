use std::fmt;

use serde::{Deserialize, Serialize};

/// Permission represents a bitmask of granted robot-management permissions
/// a user holds within one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    pub const ROBOT_LIST: Permission = Permission(1 << 0); // 1
    pub const ROBOT_READ: Permission = Permission(1 << 1); // 2
    pub const ROBOT_CREATE: Permission = Permission(1 << 2); // 4
    pub const ROBOT_UPDATE: Permission = Permission(1 << 3); // 8
    pub const ROBOT_DELETE: Permission = Permission(1 << 4); // 16
    pub const ROBOT_ADMIN: Permission = Permission(1 << 5); // 32

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if this permission bitmask contains the required permission.
    #[must_use]
    pub const fn has(self, required: Permission) -> bool {
        self.0 & required.0 == required.0
    }

    /// Combines two permission bitmasks.
    #[must_use]
    pub const fn union(self, other: Permission) -> Permission {
        Permission(self.0 | other.0)
    }

    /// Removes permissions from this bitmask.
    #[must_use]
    pub const fn difference(self, other: Permission) -> Permission {
        Permission(self.0 & !other.0)
    }

    /// Expands a permission bitmask to include implied permissions.
    /// admin implies create/update/delete, any of those implies read, read implies list.
    /// This should only be used for ALLOW permissions, never for DENY.
    #[must_use]
    pub fn expand_implied(self) -> Permission {
        let mut result = self.0;

        if self.has(Self::ROBOT_ADMIN) {
            result |= Self::ROBOT_CREATE.0 | Self::ROBOT_UPDATE.0 | Self::ROBOT_DELETE.0;
        }
        let writes = Self::ROBOT_CREATE.0 | Self::ROBOT_UPDATE.0 | Self::ROBOT_DELETE.0;
        if result & writes != 0 {
            result |= Self::ROBOT_READ.0;
        }
        if Permission(result).has(Self::ROBOT_READ) {
            result |= Self::ROBOT_LIST.0;
        }

        Permission(result)
    }

    /// Converts a permission string to its bitmask value.
    pub fn parse(s: &str) -> Option<Permission> {
        match s {
            "robot:list" => Some(Self::ROBOT_LIST),
            "robot:read" => Some(Self::ROBOT_READ),
            "robot:create" => Some(Self::ROBOT_CREATE),
            "robot:update" => Some(Self::ROBOT_UPDATE),
            "robot:delete" => Some(Self::ROBOT_DELETE),
            "robot:admin" => Some(Self::ROBOT_ADMIN),
            _ => None,
        }
    }

    /// Converts a slice of permission strings to a combined bitmask.
    pub fn parse_many(strs: &[&str]) -> Option<Permission> {
        let mut result = Permission::default();
        for s in strs {
            result = result.union(Self::parse(s)?);
        }
        Some(result)
    }

    /// Returns a slice of permission strings for this bitmask.
    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        const NAMES: [(Permission, &str); 6] = [
            (Permission::ROBOT_LIST, "robot:list"),
            (Permission::ROBOT_READ, "robot:read"),
            (Permission::ROBOT_CREATE, "robot:create"),
            (Permission::ROBOT_UPDATE, "robot:update"),
            (Permission::ROBOT_DELETE, "robot:delete"),
            (Permission::ROBOT_ADMIN, "robot:admin"),
        ];
        NAMES
            .iter()
            .filter(|(p, _)| self.has(*p))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

impl From<i64> for Permission {
    fn from(bits: i64) -> Self {
        Self(bits as u32)
    }
}

impl From<Permission> for i64 {
    fn from(p: Permission) -> Self {
        p.0 as i64
    }
}

/// An operation on the robot resource, checked by the access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RobotAction {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl RobotAction {
    #[must_use]
    pub const fn required_permission(self) -> Permission {
        match self {
            RobotAction::Create => Permission::ROBOT_CREATE,
            RobotAction::Read => Permission::ROBOT_READ,
            RobotAction::Update => Permission::ROBOT_UPDATE,
            RobotAction::Delete => Permission::ROBOT_DELETE,
            RobotAction::List => Permission::ROBOT_LIST,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RobotAction::Create => "create",
            RobotAction::Read => "read",
            RobotAction::Update => "update",
            RobotAction::Delete => "delete",
            RobotAction::List => "list",
        }
    }
}

impl fmt::Display for RobotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
