//! Notification types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewRequest,
    StatusChange,
    NewComment,
    PrayingFor,
    MemberJoined,
    OrgMemberJoined,
    MeetingScheduled,
    MeetingUpdated,
    MeetingCancelled,
    FollowUpDue,
    General,
}

/// The entity family a notification's `reference_id` points into
///
/// Cascade deletion uses this to remove exactly the notifications that
/// reference rows being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceScope {
    Request,
    Group,
    Organization,
    Meeting,
    None,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewRequest => "new_request",
            NotificationKind::StatusChange => "status_change",
            NotificationKind::NewComment => "new_comment",
            NotificationKind::PrayingFor => "praying_for",
            NotificationKind::MemberJoined => "member_joined",
            NotificationKind::OrgMemberJoined => "org_member_joined",
            NotificationKind::MeetingScheduled => "meeting_scheduled",
            NotificationKind::MeetingUpdated => "meeting_updated",
            NotificationKind::MeetingCancelled => "meeting_cancelled",
            NotificationKind::FollowUpDue => "follow_up_due",
            NotificationKind::General => "general",
        }
    }

    pub fn scope(&self) -> ReferenceScope {
        match self {
            NotificationKind::NewRequest
            | NotificationKind::StatusChange
            | NotificationKind::NewComment
            | NotificationKind::PrayingFor
            | NotificationKind::FollowUpDue => ReferenceScope::Request,
            NotificationKind::MemberJoined => ReferenceScope::Group,
            NotificationKind::OrgMemberJoined => ReferenceScope::Organization,
            NotificationKind::MeetingScheduled
            | NotificationKind::MeetingUpdated
            | NotificationKind::MeetingCancelled => ReferenceScope::Meeting,
            NotificationKind::General => ReferenceScope::None,
        }
    }

    /// Kinds whose `reference_id` is a prayer request id
    pub fn request_scoped() -> &'static [NotificationKind] {
        &[
            NotificationKind::NewRequest,
            NotificationKind::StatusChange,
            NotificationKind::NewComment,
            NotificationKind::PrayingFor,
            NotificationKind::FollowUpDue,
        ]
    }

    /// Kinds whose `reference_id` is a meeting id
    pub fn meeting_scoped() -> &'static [NotificationKind] {
        &[
            NotificationKind::MeetingScheduled,
            NotificationKind::MeetingUpdated,
            NotificationKind::MeetingCancelled,
        ]
    }
}

impl Default for NotificationKind {
    fn default() -> Self {
        NotificationKind::General
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An in-app notification
///
/// Created as a side effect of other writes; the only field ever mutated
/// afterwards is `read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub reference_id: Option<i64>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a notification row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub reference_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_serde() {
        let json = serde_json::to_string(&NotificationKind::MeetingCancelled).unwrap();
        assert_eq!(json, "\"meeting_cancelled\"");
        let back: NotificationKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NotificationKind::MeetingCancelled);
    }

    #[test]
    fn scopes_cover_every_kind() {
        for kind in NotificationKind::request_scoped() {
            assert_eq!(kind.scope(), ReferenceScope::Request);
        }
        for kind in NotificationKind::meeting_scoped() {
            assert_eq!(kind.scope(), ReferenceScope::Meeting);
        }
        assert_eq!(NotificationKind::MemberJoined.scope(), ReferenceScope::Group);
        assert_eq!(
            NotificationKind::OrgMemberJoined.scope(),
            ReferenceScope::Organization
        );
        assert_eq!(NotificationKind::General.scope(), ReferenceScope::None);
    }
}
