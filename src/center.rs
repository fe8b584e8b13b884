use std::sync::Arc;

use anyhow::{Error, Result};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{info, warn};

use crate::{
    clients::{
        diagnostics::DiagnosticClient, health::HealthChecker, storage::SessionStorage,
        toast::Toaster, transport::EventTransport,
    },
    config::Config,
    models::{
        health::HealthCheckResponse,
        notification::{Notification, SubscriberId},
        store::NotificationFeed,
    },
    persistence::SessionPersistence,
    store::{NotificationStore, SharedStore},
};

/// Entry point for everything that displays or manipulates notifications.
///
/// Owns the store and the push channel feeding it. The channel follows the
/// subscriber identity: changing it closes the old channel before opening a
/// new one.
pub struct NotificationCenter<S: SessionStorage> {
    store: SharedStore<S>,
    transport: Mutex<EventTransport<S>>,
    diagnostics: DiagnosticClient,
}

impl<S: SessionStorage> NotificationCenter<S> {
    pub async fn mount(
        config: &Config,
        storage: S,
        toaster: Arc<dyn Toaster>,
        subscriber: Option<SubscriberId>,
    ) -> Result<Self, Error> {
        let store = NotificationStore::hydrate(
            SessionPersistence::new(storage),
            config.max_notifications,
            config.unread_policy(),
        )
        .await
        .into_shared();

        let mut transport = EventTransport::new(config, Arc::clone(&store), toaster)?;

        if let Some(subscriber) = subscriber {
            transport.connect(subscriber).await;
        }

        info!("Notification center mounted");

        Ok(Self {
            store,
            transport: Mutex::new(transport),
            diagnostics: DiagnosticClient::new(config),
        })
    }

    pub async fn set_subscriber(&self, subscriber: Option<SubscriberId>) {
        let mut transport = self.transport.lock().await;

        match subscriber {
            Some(subscriber) => transport.connect(subscriber).await,
            None => transport.disconnect().await,
        }
    }

    pub async fn unmount(&self) {
        self.transport.lock().await.disconnect().await;
        info!("Notification center unmounted");
    }

    pub async fn subscriber(&self) -> Option<SubscriberId> {
        self.transport.lock().await.subscriber().cloned()
    }

    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_open()
    }

    /// Waits until the current push channel closes. The transport lock is
    /// released before waiting.
    pub async fn closed(&self) {
        let closed = self.transport.lock().await.closed();
        closed.await;
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.store.lock().await.notifications()
    }

    pub async fn unread_count(&self) -> usize {
        self.store.lock().await.unread_count()
    }

    pub async fn feed(&self) -> NotificationFeed {
        self.store.lock().await.snapshot()
    }

    pub async fn mark_as_read(&self, id: &str) -> bool {
        self.store.lock().await.mark_read(id).await
    }

    pub async fn mark_all_as_read(&self) {
        self.store.lock().await.mark_all_read().await;
    }

    pub async fn clear_notification(&self, id: &str) -> bool {
        self.store.lock().await.remove(id).await
    }

    pub async fn clear_all_notifications(&self) {
        self.store.lock().await.clear_all().await;
    }

    /// Requests a synthetic push for the current subscriber without waiting
    /// for the outcome.
    pub async fn send_test_notification(&self) -> Option<JoinHandle<()>> {
        let Some(subscriber) = self.subscriber().await else {
            warn!("Cannot request a test notification without a subscriber");
            return None;
        };

        Some(self.diagnostics.trigger(&subscriber))
    }

    pub async fn storage_health(&self) -> Result<(), Error> {
        self.store.lock().await.health_check().await
    }

    pub async fn health(&self) -> HealthCheckResponse {
        HealthChecker::check_all(self).await
    }
}
