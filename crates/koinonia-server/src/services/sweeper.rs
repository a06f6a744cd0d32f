//! Periodic follow-up sweep
//!
//! Requests that are still waiting past their follow-up date get flagged
//! stale and their owners get a reminder. The store flips each row at
//! most once, so the sweep can run as often as it likes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use koinonia_core::{Result, Storage};
use koinonia_types::NotificationKind;

use super::outbox::{Audience, NotificationBatch, NotificationOutbox};

pub struct StaleSweeper {
    store: Arc<dyn Storage>,
    outbox: NotificationOutbox,
}

impl StaleSweeper {
    pub fn new(store: Arc<dyn Storage>, outbox: NotificationOutbox) -> Self {
        Self { store, outbox }
    }

    /// One sweep pass. Returns how many requests were newly flagged.
    pub async fn run_once(&self) -> Result<usize> {
        let marked = self.store.mark_stale_requests(Utc::now()).await?;
        for request in &marked {
            self.outbox.enqueue(NotificationBatch {
                audience: Audience::User(request.user_id),
                actor_id: None,
                kind: NotificationKind::FollowUpDue,
                message: format!("Time to follow up on '{}'", request.title),
                reference_id: Some(request.id),
            });
        }
        if !marked.is_empty() {
            info!("Flagged {} prayer requests for follow-up", marked.len());
        }
        Ok(marked.len())
    }

    /// Runs the sweep on an interval, first pass immediately. Errors are
    /// logged and the loop keeps going.
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_once().await {
                    warn!("Stale sweep failed: {}", e);
                }
            }
        })
    }
}
