use anyhow::{Error, Result, anyhow};
use tracing::{debug, warn};

use crate::{clients::storage::SessionStorage, models::notification::Notification};

pub const NOTIFICATIONS_KEY: &str = "notifications";
pub const UNREAD_COUNT_KEY: &str = "unreadCount";

/// Mirrors notification state into session storage under two fixed keys.
pub struct SessionPersistence<S: SessionStorage> {
    storage: S,
}

impl<S: SessionStorage> SessionPersistence<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn save(
        &mut self,
        notifications: &[Notification],
        unread_count: usize,
    ) -> Result<(), Error> {
        let serialized = serde_json::to_string(notifications)
            .map_err(|e| anyhow!("Failed to serialize notifications: {}", e))?;

        self.storage.set(NOTIFICATIONS_KEY, serialized).await?;
        self.storage
            .set(UNREAD_COUNT_KEY, unread_count.to_string())
            .await?;

        debug!(
            notifications = notifications.len(),
            unread_count, "Notification state saved"
        );

        Ok(())
    }

    /// Never fails: missing or unreadable state comes back empty.
    pub async fn load(&mut self) -> (Vec<Notification>, usize) {
        match self.try_load().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable notification state");
                (Vec::new(), 0)
            }
        }
    }

    async fn try_load(&mut self) -> Result<(Vec<Notification>, usize), Error> {
        let notifications = match self.storage.get(NOTIFICATIONS_KEY).await? {
            Some(raw) => serde_json::from_str::<Vec<Notification>>(&raw)
                .map_err(|e| anyhow!("Stored notifications are corrupt: {}", e))?,
            None => Vec::new(),
        };

        let unread_count = match self.storage.get(UNREAD_COUNT_KEY).await? {
            Some(raw) => serde_json::from_str::<usize>(raw.trim())
                .map_err(|e| anyhow!("Stored unread count is corrupt: {}", e))?,
            None => 0,
        };

        Ok((notifications, unread_count))
    }

    pub async fn health_check(&mut self) -> Result<(), Error> {
        self.storage.health_check().await
    }
}
