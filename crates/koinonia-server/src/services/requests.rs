//! Prayer request and comment flows
//!
//! Wraps the bare store with the guards it deliberately omits: the
//! already-praying check, private-comment visibility, and the fan-out
//! triggers for request activity.

use std::sync::Arc;

use koinonia_core::{Error, Result, Storage};
use koinonia_types::{
    Comment, NewComment, NewPrayerRequest, NotificationKind, PrayerRequest, PrayerRequestUpdate,
    PrayingFor, RequestStatus,
};

use super::outbox::{Audience, NotificationBatch, NotificationOutbox};

#[derive(Clone)]
pub struct RequestService {
    store: Arc<dyn Storage>,
    outbox: NotificationOutbox,
}

impl RequestService {
    pub fn new(store: Arc<dyn Storage>, outbox: NotificationOutbox) -> Self {
        Self { store, outbox }
    }

    /// Creates a request in its group and notifies the other members.
    /// Anonymous requests keep the author out of the message.
    pub async fn create_request(&self, new: NewPrayerRequest) -> Result<PrayerRequest> {
        if self.store.get_group(new.group_id).await?.is_none() {
            return Err(Error::NotFound("group"));
        }

        let author = if new.is_anonymous {
            "Someone".to_string()
        } else {
            self.display_name(new.user_id).await?
        };

        let request = self.store.create_prayer_request(new).await?;
        self.outbox.enqueue(NotificationBatch {
            audience: Audience::Group(request.group_id),
            actor_id: Some(request.user_id),
            kind: NotificationKind::NewRequest,
            message: format!("{} shared a new prayer request: {}", author, request.title),
            reference_id: Some(request.id),
        });
        Ok(request)
    }

    /// Sets the request status. Fan-out happens only when the stored
    /// status actually changed; the owner is treated as the actor.
    pub async fn update_status(
        &self,
        id: i64,
        status: RequestStatus,
    ) -> Result<Option<PrayerRequest>> {
        let before = match self.store.get_prayer_request(id).await? {
            Some(request) => request,
            None => return Ok(None),
        };

        let updated = self
            .store
            .update_prayer_request(
                id,
                PrayerRequestUpdate {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;

        if let Some(request) = &updated {
            if request.status != before.status {
                self.outbox.enqueue(NotificationBatch {
                    audience: Audience::Group(request.group_id),
                    actor_id: Some(request.user_id),
                    kind: NotificationKind::StatusChange,
                    message: format!(
                        "Prayer request '{}' was marked {}",
                        request.title,
                        request.status.as_str()
                    ),
                    reference_id: Some(request.id),
                });
            }
        }
        Ok(updated)
    }

    /// Adds a comment. Public comments fan out to the group; a private
    /// comment notifies only the request owner.
    pub async fn add_comment(&self, new: NewComment) -> Result<Comment> {
        let request = match self.store.get_prayer_request(new.prayer_request_id).await? {
            Some(request) => request,
            None => return Err(Error::NotFound("prayer request")),
        };

        let commenter = self.display_name(new.user_id).await?;
        let comment = self.store.create_comment(new).await?;

        let batch = if comment.is_private {
            NotificationBatch {
                audience: Audience::User(request.user_id),
                actor_id: Some(comment.user_id),
                kind: NotificationKind::NewComment,
                message: format!(
                    "{} left you a private comment on '{}'",
                    commenter, request.title
                ),
                reference_id: Some(request.id),
            }
        } else {
            NotificationBatch {
                audience: Audience::Group(request.group_id),
                actor_id: Some(comment.user_id),
                kind: NotificationKind::NewComment,
                message: format!("{} commented on '{}'", commenter, request.title),
                reference_id: Some(request.id),
            }
        };
        self.outbox.enqueue(batch);
        Ok(comment)
    }

    /// Comments on a request as one viewer sees them: private comments
    /// stay between their author and the request owner.
    pub async fn list_comments_for(&self, request_id: i64, viewer_id: i64) -> Result<Vec<Comment>> {
        let request = match self.store.get_prayer_request(request_id).await? {
            Some(request) => request,
            None => return Err(Error::NotFound("prayer request")),
        };

        let comments = self.store.list_comments(request_id).await?;
        let visible = comments
            .into_iter()
            .filter(|c| !c.is_private || c.user_id == viewer_id || request.user_id == viewer_id)
            .collect();
        Ok(visible)
    }

    /// Records that a user is praying for a request. The store accepts
    /// duplicate rows, so the guard lives here.
    pub async fn add_praying_for(&self, request_id: i64, user_id: i64) -> Result<PrayingFor> {
        let request = match self.store.get_prayer_request(request_id).await? {
            Some(request) => request,
            None => return Err(Error::NotFound("prayer request")),
        };
        if self
            .store
            .get_praying_for(request_id, user_id)
            .await?
            .is_some()
        {
            return Err(Error::AlreadyPraying {
                prayer_request_id: request_id,
                user_id,
            });
        }

        let praying = self.store.add_praying_for(request_id, user_id).await?;

        if request.user_id != user_id {
            let prayer = self.display_name(user_id).await?;
            self.outbox.enqueue(NotificationBatch {
                audience: Audience::User(request.user_id),
                actor_id: Some(user_id),
                kind: NotificationKind::PrayingFor,
                message: format!("{} is praying for '{}'", prayer, request.title),
                reference_id: Some(request.id),
            });
        }
        Ok(praying)
    }

    pub async fn remove_praying_for(&self, request_id: i64, user_id: i64) -> Result<bool> {
        self.store.remove_praying_for(request_id, user_id).await
    }

    async fn display_name(&self, user_id: i64) -> Result<String> {
        Ok(self
            .store
            .get_user(user_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| "Someone".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use koinonia_types::{NewGroup, NewGroupMember, NewUser, UserRole};

    struct Fixture {
        store: Arc<dyn Storage>,
        service: RequestService,
        outbox: NotificationOutbox,
        worker: tokio::task::JoinHandle<()>,
        group_id: i64,
    }

    /// Users 1..=3 in one group; user 1 created the group.
    async fn fixture() -> Fixture {
        let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        for n in 1..=3 {
            store
                .create_user(NewUser {
                    username: format!("user{}", n),
                    email: format!("user{}@example.com", n),
                    password: "hash".to_string(),
                    name: format!("User {}", n),
                    role: UserRole::Regular,
                })
                .await
                .unwrap();
        }
        let group = store
            .create_group(NewGroup {
                name: "Circle".to_string(),
                description: None,
                category: "general".to_string(),
                privacy: Default::default(),
                organization_id: 1,
                created_by: 1,
            })
            .await
            .unwrap();
        for user_id in [2, 3] {
            store
                .add_group_member(NewGroupMember {
                    group_id: group.id,
                    user_id,
                    role: Default::default(),
                })
                .await
                .unwrap();
        }

        let (outbox, worker) = NotificationOutbox::spawn(store.clone());
        let service = RequestService::new(store.clone(), outbox.clone());
        Fixture {
            store,
            service,
            outbox,
            worker,
            group_id: group.id,
        }
    }

    async fn drain(fx: Fixture) -> Arc<dyn Storage> {
        let Fixture {
            store,
            service,
            outbox,
            worker,
            ..
        } = fx;
        drop(service);
        drop(outbox);
        worker.await.unwrap();
        store
    }

    fn new_request(group_id: i64, user_id: i64, anonymous: bool) -> NewPrayerRequest {
        NewPrayerRequest {
            group_id,
            user_id,
            title: "Healing".to_string(),
            description: "For a friend".to_string(),
            status: Default::default(),
            urgency: Default::default(),
            is_anonymous: anonymous,
            follow_up_date: None,
        }
    }

    #[tokio::test]
    async fn create_request_notifies_group_and_hides_anonymous_author() {
        let fx = fixture().await;
        fx.service
            .create_request(new_request(fx.group_id, 1, true))
            .await
            .unwrap();

        let store = drain(fx).await;
        let for_two = store.list_notifications(2).await.unwrap();
        assert_eq!(for_two.len(), 1);
        assert!(for_two[0].message.starts_with("Someone"));
        assert!(store.list_notifications(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_request_requires_existing_group() {
        let fx = fixture().await;
        let err = fx
            .service
            .create_request(new_request(999, 1, false))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("group")));
        drain(fx).await;
    }

    #[tokio::test]
    async fn status_fanout_fires_only_when_status_changes() {
        let fx = fixture().await;
        let request = fx
            .service
            .create_request(new_request(fx.group_id, 1, false))
            .await
            .unwrap();

        fx.service
            .update_status(request.id, RequestStatus::Answered)
            .await
            .unwrap()
            .unwrap();
        fx.service
            .update_status(request.id, RequestStatus::Answered)
            .await
            .unwrap()
            .unwrap();

        let store = drain(fx).await;
        let status_changes: Vec<_> = store
            .list_notifications(2)
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.kind == NotificationKind::StatusChange)
            .collect();
        assert_eq!(status_changes.len(), 1);
        assert!(status_changes[0].message.contains("answered"));
    }

    #[tokio::test]
    async fn private_comments_stay_between_author_and_owner() {
        let fx = fixture().await;
        let request = fx
            .service
            .create_request(new_request(fx.group_id, 1, false))
            .await
            .unwrap();

        fx.service
            .add_comment(NewComment {
                prayer_request_id: request.id,
                user_id: 2,
                body: "Praying for you".to_string(),
                is_private: false,
            })
            .await
            .unwrap();
        fx.service
            .add_comment(NewComment {
                prayer_request_id: request.id,
                user_id: 2,
                body: "Call me if you need anything".to_string(),
                is_private: true,
            })
            .await
            .unwrap();

        let owner_view = fx.service.list_comments_for(request.id, 1).await.unwrap();
        assert_eq!(owner_view.len(), 2);
        let author_view = fx.service.list_comments_for(request.id, 2).await.unwrap();
        assert_eq!(author_view.len(), 2);
        let third_party_view = fx.service.list_comments_for(request.id, 3).await.unwrap();
        assert_eq!(third_party_view.len(), 1);
        assert!(!third_party_view[0].is_private);

        // The private comment reached only the owner.
        let store = drain(fx).await;
        let for_three = store.list_notifications(3).await.unwrap();
        assert!(for_three
            .iter()
            .all(|n| !n.message.contains("private comment")));
        let for_one = store.list_notifications(1).await.unwrap();
        assert!(for_one
            .iter()
            .any(|n| n.message.contains("private comment")));
    }

    #[tokio::test]
    async fn duplicate_praying_rejected_by_service_but_not_store() {
        let fx = fixture().await;
        let request = fx
            .service
            .create_request(new_request(fx.group_id, 1, false))
            .await
            .unwrap();

        fx.service.add_praying_for(request.id, 2).await.unwrap();
        let err = fx
            .service
            .add_praying_for(request.id, 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AlreadyPraying {
                prayer_request_id: _,
                user_id: 2
            }
        ));
        assert_eq!(fx.store.count_praying_for(request.id).await.unwrap(), 1);

        // The bare store takes the duplicate without complaint.
        fx.store.add_praying_for(request.id, 2).await.unwrap();
        assert_eq!(fx.store.count_praying_for(request.id).await.unwrap(), 2);
        drain(fx).await;
    }

    #[tokio::test]
    async fn owner_hears_about_praying_unless_praying_themselves() {
        let fx = fixture().await;
        let request = fx
            .service
            .create_request(new_request(fx.group_id, 1, false))
            .await
            .unwrap();

        fx.service.add_praying_for(request.id, 1).await.unwrap();
        fx.service.add_praying_for(request.id, 2).await.unwrap();

        let store = drain(fx).await;
        let praying: Vec<_> = store
            .list_notifications(1)
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.kind == NotificationKind::PrayingFor)
            .collect();
        assert_eq!(praying.len(), 1);
        assert!(praying[0].message.starts_with("User 2"));
    }
}
