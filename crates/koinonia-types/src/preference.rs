//! Notification preference types
//!
//! Preference rows are created lazily: the first read for a user (or
//! user+group) materializes a default row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::NotificationKind;

/// Platform-wide notification preferences for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub id: i64,
    pub user_id: i64,
    pub new_requests: bool,
    pub status_changes: bool,
    pub comments: bool,
    pub meetings: bool,
    /// Hours between follow-up reminders
    pub reminder_interval_hours: i64,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreference {
    /// The row materialized on first read
    pub fn default_for(user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            user_id,
            new_requests: true,
            status_changes: true,
            comments: true,
            meetings: true,
            reminder_interval_hours: 24,
            updated_at: now,
        }
    }

    /// Whether fan-out for `kind` should reach this user
    ///
    /// Kinds without a dedicated toggle (membership, direct notices) are
    /// always allowed.
    pub fn allows(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::NewRequest => self.new_requests,
            NotificationKind::StatusChange => self.status_changes,
            NotificationKind::NewComment => self.comments,
            NotificationKind::MeetingScheduled
            | NotificationKind::MeetingUpdated
            | NotificationKind::MeetingCancelled => self.meetings,
            _ => true,
        }
    }
}

/// Partial update for a user's notification preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPreferenceUpdate {
    pub new_requests: Option<bool>,
    pub status_changes: Option<bool>,
    pub comments: Option<bool>,
    pub meetings: Option<bool>,
    pub reminder_interval_hours: Option<i64>,
}

/// Per-group overrides for one user
///
/// `muted` silences every fan-out from the group regardless of the
/// per-kind toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNotificationPreference {
    pub id: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub muted: bool,
    pub new_requests: bool,
    pub status_changes: bool,
    pub comments: bool,
    pub meetings: bool,
    pub updated_at: DateTime<Utc>,
}

impl GroupNotificationPreference {
    /// The row materialized on first read
    pub fn default_for(user_id: i64, group_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            user_id,
            group_id,
            muted: false,
            new_requests: true,
            status_changes: true,
            comments: true,
            meetings: true,
            updated_at: now,
        }
    }

    /// Whether fan-out for `kind` from this group should reach the user
    pub fn allows(&self, kind: NotificationKind) -> bool {
        if self.muted {
            return false;
        }
        match kind {
            NotificationKind::NewRequest => self.new_requests,
            NotificationKind::StatusChange => self.status_changes,
            NotificationKind::NewComment => self.comments,
            NotificationKind::MeetingScheduled
            | NotificationKind::MeetingUpdated
            | NotificationKind::MeetingCancelled => self.meetings,
            _ => true,
        }
    }
}

/// Partial update for a user's per-group preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupNotificationPreferenceUpdate {
    pub muted: Option<bool>,
    pub new_requests: Option<bool>,
    pub status_changes: Option<bool>,
    pub comments: Option<bool>,
    pub meetings: Option<bool>,
}
