use serde::{Deserialize, Serialize};

use crate::models::notification::Notification;

/// How removal and eviction treat the unread counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnreadPolicy {
    /// Removing an unread notification leaves the counter as it was.
    #[default]
    Retain,
    /// Removing an unread notification decrements the counter.
    Reconcile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}
