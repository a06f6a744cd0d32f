//! Meeting scheduling, notes and note-to-request conversion

use std::sync::Arc;

use koinonia_core::{Error, Result, Storage};
use koinonia_types::{
    Meeting, MeetingNote, MeetingUpdate, NewMeeting, NewMeetingNote, NewPrayerRequest,
    NoteRequestEntry, NotificationKind, PrayerRequest,
};

use super::outbox::{Audience, NotificationBatch, NotificationOutbox};
use super::requests::RequestService;

#[derive(Clone)]
pub struct MeetingService {
    store: Arc<dyn Storage>,
    outbox: NotificationOutbox,
    /// Note conversion goes through the normal request flow so each
    /// extracted request gets the usual new-request fan-out.
    requests: RequestService,
}

impl MeetingService {
    pub fn new(store: Arc<dyn Storage>, outbox: NotificationOutbox) -> Self {
        let requests = RequestService::new(store.clone(), outbox.clone());
        Self {
            store,
            outbox,
            requests,
        }
    }

    pub async fn schedule_meeting(&self, new: NewMeeting) -> Result<Meeting> {
        if self.store.get_group(new.group_id).await?.is_none() {
            return Err(Error::NotFound("group"));
        }

        let meeting = self.store.create_meeting(new).await?;
        self.outbox.enqueue(NotificationBatch {
            audience: Audience::Group(meeting.group_id),
            actor_id: Some(meeting.created_by),
            kind: NotificationKind::MeetingScheduled,
            message: format!("New meeting scheduled: {}", meeting.title),
            reference_id: Some(meeting.id),
        });
        Ok(meeting)
    }

    pub async fn update_meeting(
        &self,
        id: i64,
        update: MeetingUpdate,
        actor_id: i64,
    ) -> Result<Option<Meeting>> {
        let updated = self.store.update_meeting(id, update).await?;
        if let Some(meeting) = &updated {
            self.outbox.enqueue(NotificationBatch {
                audience: Audience::Group(meeting.group_id),
                actor_id: Some(actor_id),
                kind: NotificationKind::MeetingUpdated,
                message: format!("Meeting updated: {}", meeting.title),
                reference_id: Some(meeting.id),
            });
        }
        Ok(updated)
    }

    /// Deletes the meeting (with its notes and notifications) and tells
    /// the group, using the title captured before the delete.
    pub async fn cancel_meeting(&self, id: i64, actor_id: i64) -> Result<bool> {
        let meeting = match self.store.get_meeting(id).await? {
            Some(meeting) => meeting,
            None => return Ok(false),
        };

        if !self.store.delete_meeting(id).await? {
            return Ok(false);
        }

        self.outbox.enqueue(NotificationBatch {
            audience: Audience::Group(meeting.group_id),
            actor_id: Some(actor_id),
            kind: NotificationKind::MeetingCancelled,
            message: format!("Meeting cancelled: {}", meeting.title),
            reference_id: Some(meeting.id),
        });
        Ok(true)
    }

    pub async fn add_note(&self, new: NewMeetingNote) -> Result<MeetingNote> {
        if self.store.get_meeting(new.meeting_id).await?.is_none() {
            return Err(Error::NotFound("meeting"));
        }
        self.store.create_meeting_note(new).await
    }

    /// Turns a meeting note into prayer requests in the meeting's group,
    /// one per entry, authored by `author_id`.
    pub async fn convert_note_to_requests(
        &self,
        note_id: i64,
        author_id: i64,
        entries: Vec<NoteRequestEntry>,
    ) -> Result<Vec<PrayerRequest>> {
        let note = match self.store.get_meeting_note(note_id).await? {
            Some(note) => note,
            None => return Err(Error::NotFound("meeting note")),
        };
        let meeting = match self.store.get_meeting(note.meeting_id).await? {
            Some(meeting) => meeting,
            None => return Err(Error::NotFound("meeting")),
        };

        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            let request = self
                .requests
                .create_request(NewPrayerRequest {
                    group_id: meeting.group_id,
                    user_id: author_id,
                    title: entry.title,
                    description: entry.description,
                    status: Default::default(),
                    urgency: entry.urgency,
                    is_anonymous: false,
                    follow_up_date: None,
                })
                .await?;
            created.push(request);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{Duration, Utc};
    use koinonia_types::{NewGroup, NewGroupMember, NewUser, Urgency, UserRole};

    async fn fixture() -> (
        Arc<dyn Storage>,
        MeetingService,
        tokio::task::JoinHandle<()>,
        i64,
    ) {
        let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        let leader = store
            .create_user(NewUser {
                username: "leader".to_string(),
                email: "leader@example.com".to_string(),
                password: "hash".to_string(),
                name: "Leader".to_string(),
                role: UserRole::Leader,
            })
            .await
            .unwrap();
        let group = store
            .create_group(NewGroup {
                name: "Evening".to_string(),
                description: None,
                category: "general".to_string(),
                privacy: Default::default(),
                organization_id: 1,
                created_by: leader.id,
            })
            .await
            .unwrap();
        store
            .add_group_member(NewGroupMember {
                group_id: group.id,
                user_id: 99,
                role: Default::default(),
            })
            .await
            .unwrap();

        let (outbox, worker) = NotificationOutbox::spawn(store.clone());
        let service = MeetingService::new(store.clone(), outbox);
        (store, service, worker, group.id)
    }

    fn new_meeting(group_id: i64, created_by: i64) -> NewMeeting {
        NewMeeting {
            group_id,
            title: "Tuesday prayer".to_string(),
            description: None,
            meeting_type: Default::default(),
            meeting_link: "https://example.com/meet".to_string(),
            start_time: Utc::now() + Duration::days(1),
            end_time: None,
            is_recurring: false,
            recurrence: None,
            recurrence_until: None,
            created_by,
        }
    }

    #[tokio::test]
    async fn cancelling_keeps_the_title_in_the_message() {
        let (store, service, worker, group_id) = fixture().await;
        let creator = store.list_group_members(group_id).await.unwrap()[0].user_id;
        let meeting = service
            .schedule_meeting(new_meeting(group_id, creator))
            .await
            .unwrap();

        assert!(service.cancel_meeting(meeting.id, creator).await.unwrap());
        assert!(!service.cancel_meeting(meeting.id, creator).await.unwrap());

        drop(service);
        worker.await.unwrap();

        let for_member = store.list_notifications(99).await.unwrap();
        let cancelled: Vec<_> = for_member
            .iter()
            .filter(|n| n.kind == NotificationKind::MeetingCancelled)
            .collect();
        assert_eq!(cancelled.len(), 1);
        assert!(cancelled[0].message.contains("Tuesday prayer"));
        assert!(store.get_meeting(meeting.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn notes_require_an_existing_meeting() {
        let (_store, service, worker, _group_id) = fixture().await;
        let err = service
            .add_note(NewMeetingNote {
                meeting_id: 999,
                content: "Lost".to_string(),
                summary: None,
                is_ai_generated: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("meeting")));
        drop(service);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn note_conversion_creates_requests_with_fanout() {
        let (store, service, worker, group_id) = fixture().await;
        let creator = store.list_group_members(group_id).await.unwrap()[0].user_id;
        let meeting = service
            .schedule_meeting(new_meeting(group_id, creator))
            .await
            .unwrap();
        let note = service
            .add_note(NewMeetingNote {
                meeting_id: meeting.id,
                content: "Pray for Anna's surgery and Ben's job search".to_string(),
                summary: Some("Two needs".to_string()),
                is_ai_generated: true,
            })
            .await
            .unwrap();

        let created = service
            .convert_note_to_requests(
                note.id,
                creator,
                vec![
                    NoteRequestEntry {
                        title: "Anna's surgery".to_string(),
                        description: "Scheduled for Friday".to_string(),
                        urgency: Urgency::High,
                    },
                    NoteRequestEntry {
                        title: "Ben's job search".to_string(),
                        description: "Third month looking".to_string(),
                        urgency: Urgency::Medium,
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].group_id, group_id);
        assert_eq!(created[0].urgency, Urgency::High);

        drop(service);
        worker.await.unwrap();

        let new_request_notices: Vec<_> = store
            .list_notifications(99)
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.kind == NotificationKind::NewRequest)
            .collect();
        assert_eq!(new_request_notices.len(), 2);
    }

    #[tokio::test]
    async fn conversion_of_missing_note_fails() {
        let (_store, service, worker, _group_id) = fixture().await;
        let err = service
            .convert_note_to_requests(999, 1, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("meeting note")));
        drop(service);
        worker.await.unwrap();
    }
}
