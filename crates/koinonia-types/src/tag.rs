//! Tag types
//!
//! Tags label groups and organizations for discovery; the link rows form the
//! many-to-many sides.

use serde::{Deserialize, Serialize};

/// A label shared across groups and organizations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Payload for creating a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
}

/// Link row attaching a tag to a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTag {
    pub id: i64,
    pub group_id: i64,
    pub tag_id: i64,
}

/// Link row attaching a tag to an organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationTag {
    pub id: i64,
    pub organization_id: i64,
    pub tag_id: i64,
}
