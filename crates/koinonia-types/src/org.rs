//! Organization types
//!
//! An organization is the top-level tenant: it owns groups and carries its own
//! admin/member role split.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Admin,
    Member,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Admin => "admin",
            OrgRole::Member => "member",
        }
    }
}

impl Default for OrgRole {
    fn default() -> Self {
        OrgRole::Member
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A top-level organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Membership row linking a user to an organization
///
/// The (organization, user) pair is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub id: i64,
    pub organization_id: i64,
    pub user_id: i64,
    pub role: OrgRole,
    pub joined_at: DateTime<Utc>,
}

/// Payload for creating an organization
///
/// The creator is automatically added as an admin member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub description: Option<String>,
    pub created_by: i64,
}

/// Partial update for an organization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

/// Payload for adding an organization member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrganizationMember {
    pub organization_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub role: OrgRole,
}
