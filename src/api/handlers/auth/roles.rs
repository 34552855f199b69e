//! Primary and staff role types.
//!
//! A user holds exactly one primary role; staff roles are additional,
//! non-exclusive capability tags layered on top of it.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Top-level user classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Organizer,
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Organizer => "organizer",
            Self::User => "user",
        }
    }

    /// Parse a stored role string. Unknown values collapse to the least
    /// privileged role rather than failing the whole record.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "organizer" => Self::Organizer,
            _ => Self::User,
        }
    }
}

/// Additional capability tag; a user may hold several at once.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Staff,
    TeamMembers,
    Associates,
}

impl StaffRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "STAFF",
            Self::TeamMembers => "TEAM_MEMBERS",
            Self::Associates => "ASSOCIATES",
        }
    }

    /// Parse a stored staff-role string; unknown tags are dropped by callers.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STAFF" => Some(Self::Staff),
            "TEAM_MEMBERS" => Some(Self::TeamMembers),
            "ASSOCIATES" => Some(Self::Associates),
            _ => None,
        }
    }
}
