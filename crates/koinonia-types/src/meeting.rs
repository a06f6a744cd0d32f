//! Meeting and meeting-note types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a meeting is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingKind {
    Virtual,
    InPerson,
    Hybrid,
}

impl MeetingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingKind::Virtual => "virtual",
            MeetingKind::InPerson => "in_person",
            MeetingKind::Hybrid => "hybrid",
        }
    }
}

impl Default for MeetingKind {
    fn default() -> Self {
        MeetingKind::Virtual
    }
}

impl std::fmt::Display for MeetingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Repeat cadence for recurring meetings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Biweekly => "biweekly",
            Recurrence::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scheduled group meeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: i64,
    pub group_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub meeting_type: MeetingKind,
    pub meeting_link: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub recurrence: Option<Recurrence>,
    pub recurrence_until: Option<DateTime<Utc>>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Payload for scheduling a meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMeeting {
    pub group_id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub meeting_type: MeetingKind,
    pub meeting_link: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence: Option<Recurrence>,
    pub recurrence_until: Option<DateTime<Utc>>,
    pub created_by: i64,
}

/// Partial update for a meeting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub meeting_type: Option<MeetingKind>,
    pub meeting_link: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub is_recurring: Option<bool>,
    pub recurrence: Option<Option<Recurrence>>,
    pub recurrence_until: Option<Option<DateTime<Utc>>>,
}

/// Notes captured during a meeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingNote {
    pub id: i64,
    pub meeting_id: i64,
    pub content: String,
    pub summary: Option<String>,
    pub is_ai_generated: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a meeting note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMeetingNote {
    pub meeting_id: i64,
    pub content: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub is_ai_generated: bool,
}

/// Partial update for a meeting note
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingNoteUpdate {
    pub content: Option<String>,
    pub summary: Option<Option<String>>,
}

/// One prayer request extracted from a meeting note
///
/// Used when converting a note into prayer requests for the meeting's group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRequestEntry {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub urgency: crate::Urgency,
}
