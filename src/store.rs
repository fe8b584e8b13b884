use std::{collections::VecDeque, sync::Arc};

use anyhow::{Error, Result};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    clients::storage::SessionStorage,
    models::{
        notification::Notification,
        store::{NotificationFeed, UnreadPolicy},
    },
    persistence::SessionPersistence,
};

pub type SharedStore<S> = Arc<Mutex<NotificationStore<S>>>;

/// Most-recent-first notification log with an unread counter.
///
/// The counter is maintained by the read operations, not recomputed from the
/// entries. Under [`UnreadPolicy::Retain`] removing an unread entry leaves it
/// counted, so `unread_count` may exceed the number of unread entries.
pub struct NotificationStore<S: SessionStorage> {
    notifications: VecDeque<Notification>,
    unread_count: usize,
    persistence: SessionPersistence<S>,
    max_notifications: usize,
    unread_policy: UnreadPolicy,
}

impl<S: SessionStorage> NotificationStore<S> {
    pub fn new(
        persistence: SessionPersistence<S>,
        max_notifications: usize,
        unread_policy: UnreadPolicy,
    ) -> Self {
        Self {
            notifications: VecDeque::new(),
            unread_count: 0,
            persistence,
            max_notifications: max_notifications.max(1),
            unread_policy,
        }
    }

    /// Restores whatever the persistence layer last saved.
    pub async fn hydrate(
        mut persistence: SessionPersistence<S>,
        max_notifications: usize,
        unread_policy: UnreadPolicy,
    ) -> Self {
        let (notifications, unread_count) = persistence.load().await;

        let mut store = Self::new(persistence, max_notifications, unread_policy);
        store.notifications = notifications.into();
        store.unread_count = unread_count;
        store.evict_overflow();

        debug!(
            notifications = store.notifications.len(),
            unread_count = store.unread_count,
            "Notification store hydrated"
        );

        store
    }

    pub fn into_shared(self) -> SharedStore<S> {
        Arc::new(Mutex::new(self))
    }

    /// Returns `false` when a notification with the same id is already stored.
    pub async fn append(&mut self, notification: Notification) -> bool {
        if self.contains(&notification.id) {
            warn!(id = %notification.id, "Dropping notification with duplicate id");
            return false;
        }

        self.notifications.push_front(notification);
        self.unread_count += 1;
        self.evict_overflow();

        self.persist().await;
        true
    }

    pub async fn mark_read(&mut self, id: &str) -> bool {
        let updated = match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) if !notification.read => {
                notification.read = true;
                self.unread_count = self.unread_count.saturating_sub(1);
                true
            }
            _ => false,
        };

        self.persist().await;
        updated
    }

    pub async fn mark_all_read(&mut self) {
        for notification in self.notifications.iter_mut() {
            notification.read = true;
        }
        self.unread_count = 0;

        self.persist().await;
    }

    pub async fn remove(&mut self, id: &str) -> bool {
        let removed = match self.notifications.iter().position(|n| n.id == id) {
            Some(index) => self.notifications.remove(index),
            None => None,
        };

        if let Some(notification) = &removed {
            self.forget(notification);
        }

        self.persist().await;
        removed.is_some()
    }

    pub async fn clear_all(&mut self) {
        self.notifications.clear();
        self.unread_count = 0;

        self.persist().await;
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn snapshot(&self) -> NotificationFeed {
        NotificationFeed {
            notifications: self.notifications(),
            unread_count: self.unread_count,
        }
    }

    pub async fn health_check(&mut self) -> Result<(), Error> {
        self.persistence.health_check().await
    }

    fn evict_overflow(&mut self) {
        while self.notifications.len() > self.max_notifications {
            if let Some(evicted) = self.notifications.pop_back() {
                debug!(id = %evicted.id, "Evicting oldest notification");
                self.forget(&evicted);
            }
        }
    }

    fn forget(&mut self, notification: &Notification) {
        if self.unread_policy == UnreadPolicy::Reconcile && !notification.read {
            self.unread_count = self.unread_count.saturating_sub(1);
        }
    }

    async fn persist(&mut self) {
        let notifications = self.notifications.make_contiguous();

        if let Err(e) = self.persistence.save(notifications, self.unread_count).await {
            warn!(error = %e, "Failed to persist notification state");
        }
    }
}
