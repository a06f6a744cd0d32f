//! Group types
//!
//! A group is a prayer community inside an organization, with a leader/member
//! role split.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Leader,
    Member,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Leader => "leader",
            GroupRole::Member => "member",
        }
    }
}

impl Default for GroupRole {
    fn default() -> Self {
        GroupRole::Member
    }
}

impl std::fmt::Display for GroupRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who may join a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupPrivacy {
    /// Anyone in the organization can join
    Open,
    /// Joining requires leader approval
    Request,
    /// Members join by invitation only
    Invite,
}

impl GroupPrivacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupPrivacy::Open => "open",
            GroupPrivacy::Request => "request",
            GroupPrivacy::Invite => "invite",
        }
    }
}

impl Default for GroupPrivacy {
    fn default() -> Self {
        GroupPrivacy::Open
    }
}

impl std::fmt::Display for GroupPrivacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A prayer group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub privacy: GroupPrivacy,
    pub organization_id: i64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Membership row linking a user to a group
///
/// The (group, user) pair is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

/// Payload for creating a group
///
/// The creator is automatically added as a leader member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub privacy: GroupPrivacy,
    pub organization_id: i64,
    pub created_by: i64,
}

/// Partial update for a group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub privacy: Option<GroupPrivacy>,
}

/// Payload for adding a group member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroupMember {
    pub group_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub role: GroupRole,
}
