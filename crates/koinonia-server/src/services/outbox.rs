//! Asynchronous notification delivery
//!
//! Mutations never write notification rows directly. They enqueue a
//! [`NotificationBatch`] on an unbounded channel and a single worker task
//! expands the audience, applies recipient preferences and inserts the
//! rows. A failed insert is retried a few times and then dropped with an
//! error log; it cannot fail the mutation that produced it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use koinonia_core::Storage;
use koinonia_types::{NewNotification, NotificationKind};

const DELIVERY_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_millis(50);

/// Who a batch should reach, before expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every member of the group
    Group(i64),
    /// Every member of the organization
    Organization(i64),
    /// One user directly; preference filtering is skipped
    User(i64),
}

/// One queued fan-out
#[derive(Debug, Clone)]
pub struct NotificationBatch {
    pub audience: Audience,
    /// The user whose action caused the batch; never notified
    pub actor_id: Option<i64>,
    pub kind: NotificationKind,
    pub message: String,
    pub reference_id: Option<i64>,
}

/// Cheap cloneable handle for enqueueing batches
#[derive(Clone)]
pub struct NotificationOutbox {
    tx: mpsc::UnboundedSender<NotificationBatch>,
}

impl NotificationOutbox {
    /// Starts the delivery worker. The worker drains the queue and exits
    /// once every handle has been dropped.
    pub fn spawn(store: Arc<dyn Storage>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(store, rx));
        (Self { tx }, worker)
    }

    /// Queues a batch. Infallible: if the worker is gone the batch is
    /// dropped with a warning.
    pub fn enqueue(&self, batch: NotificationBatch) {
        if self.tx.send(batch).is_err() {
            warn!("Notification worker has stopped, dropping batch");
        }
    }
}

async fn run_worker(store: Arc<dyn Storage>, mut rx: mpsc::UnboundedReceiver<NotificationBatch>) {
    while let Some(batch) = rx.recv().await {
        deliver(&store, batch).await;
    }
    debug!("Notification worker stopped");
}

async fn deliver(store: &Arc<dyn Storage>, batch: NotificationBatch) {
    let recipients = match expand_audience(store, batch.audience).await {
        Some(recipients) => recipients,
        None => {
            error!(
                "Could not expand audience {:?}, dropping {} batch",
                batch.audience,
                batch.kind.as_str()
            );
            return;
        }
    };

    for user_id in recipients {
        if batch.actor_id == Some(user_id) {
            continue;
        }
        if !wants(store, user_id, &batch).await {
            continue;
        }
        insert_with_retry(
            store,
            NewNotification {
                user_id,
                kind: batch.kind,
                message: batch.message.clone(),
                reference_id: batch.reference_id,
            },
        )
        .await;
    }
}

async fn expand_audience(store: &Arc<dyn Storage>, audience: Audience) -> Option<Vec<i64>> {
    for attempt in 1..=DELIVERY_ATTEMPTS {
        let result = match audience {
            Audience::Group(group_id) => store
                .list_group_members(group_id)
                .await
                .map(|members| members.into_iter().map(|m| m.user_id).collect()),
            Audience::Organization(organization_id) => store
                .list_organization_members(organization_id)
                .await
                .map(|members| members.into_iter().map(|m| m.user_id).collect()),
            Audience::User(user_id) => Ok(vec![user_id]),
        };
        match result {
            Ok(recipients) => return Some(recipients),
            Err(e) => {
                warn!(
                    "Audience expansion failed (attempt {}/{}): {}",
                    attempt, DELIVERY_ATTEMPTS, e
                );
                if attempt < DELIVERY_ATTEMPTS {
                    tokio::time::sleep(RETRY_BASE * attempt).await;
                }
            }
        }
    }
    None
}

/// Preference check for one recipient. Direct batches always pass; read
/// failures default to delivering rather than silently dropping.
async fn wants(store: &Arc<dyn Storage>, user_id: i64, batch: &NotificationBatch) -> bool {
    let group_id = match batch.audience {
        Audience::User(_) => return true,
        Audience::Group(group_id) => Some(group_id),
        Audience::Organization(_) => None,
    };

    let global = match store.get_notification_preference(user_id).await {
        Ok(preference) => preference,
        Err(e) => {
            warn!("Preference lookup failed for user {}: {}", user_id, e);
            return true;
        }
    };
    if !global.allows(batch.kind) {
        return false;
    }

    let group_id = match group_id {
        Some(group_id) => group_id,
        None => return true,
    };
    match store.get_group_notification_preference(user_id, group_id).await {
        Ok(preference) => preference.allows(batch.kind),
        Err(e) => {
            warn!(
                "Group preference lookup failed for user {} in group {}: {}",
                user_id, group_id, e
            );
            true
        }
    }
}

async fn insert_with_retry(store: &Arc<dyn Storage>, new: NewNotification) {
    for attempt in 1..=DELIVERY_ATTEMPTS {
        match store.create_notification(new.clone()).await {
            Ok(_) => return,
            Err(e) if attempt < DELIVERY_ATTEMPTS => {
                warn!(
                    "Notification insert failed for user {} (attempt {}/{}): {}",
                    new.user_id, attempt, DELIVERY_ATTEMPTS, e
                );
                tokio::time::sleep(RETRY_BASE * attempt).await;
            }
            Err(e) => {
                error!(
                    "Dropping notification for user {} after {} attempts: {}",
                    new.user_id, DELIVERY_ATTEMPTS, e
                );
            }
        }
    }
}
