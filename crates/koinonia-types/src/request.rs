//! Prayer request types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a prayer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Waiting,
    Answered,
    Declined,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Waiting => "waiting",
            RequestStatus::Answered => "answered",
            RequestStatus::Declined => "declined",
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Waiting
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How urgently a request needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Medium
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A prayer request shared with a group
///
/// `is_stale` is set by the sweep when a `waiting` request passes its
/// follow-up date, and cleared again when the status leaves `waiting`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerRequest {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub status: RequestStatus,
    pub urgency: Urgency,
    pub is_anonymous: bool,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub is_stale: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a prayer request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrayerRequest {
    pub group_id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub is_anonymous: bool,
    pub follow_up_date: Option<DateTime<Utc>>,
}

/// Partial update for a prayer request
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrayerRequestUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<RequestStatus>,
    pub urgency: Option<Urgency>,
    pub is_anonymous: Option<bool>,
    pub follow_up_date: Option<Option<DateTime<Utc>>>,
}

/// A comment on a prayer request
///
/// Private comments are visible only to the request owner and the comment
/// author; that filter is applied by the read path, not the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub prayer_request_id: i64,
    pub user_id: i64,
    pub body: String,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub prayer_request_id: i64,
    pub user_id: i64,
    pub body: String,
    #[serde(default)]
    pub is_private: bool,
}

/// A commitment by a user to pray for a specific request
///
/// Uniqueness of the (request, user) pair is enforced by the calling layer,
/// not by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayingFor {
    pub id: i64,
    pub prayer_request_id: i64,
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
}
