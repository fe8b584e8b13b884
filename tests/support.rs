use std::sync::Mutex;

use notification_feed::{
    clients::{storage::MemoryStorage, toast::Toaster},
    models::{notification::NotificationKind, store::UnreadPolicy},
    persistence::SessionPersistence,
    store::NotificationStore,
};
use wiremock::ResponseTemplate;

#[derive(Default)]
pub struct RecordingToaster {
    toasts: Mutex<Vec<(String, NotificationKind)>>,
}

impl RecordingToaster {
    pub fn toasts(&self) -> Vec<(String, NotificationKind)> {
        self.toasts.lock().unwrap().clone()
    }
}

impl Toaster for RecordingToaster {
    fn show(&self, message: &str, kind: NotificationKind) {
        self.toasts
            .lock()
            .unwrap()
            .push((message.to_string(), kind));
    }
}

pub fn memory_store(storage: MemoryStorage) -> NotificationStore<MemoryStorage> {
    NotificationStore::new(SessionPersistence::new(storage), 100, UnreadPolicy::Retain)
}

pub fn notification_frame(payload: &str) -> String {
    format!("event: notification\ndata: {}\n\n", payload)
}

pub fn sse_response(body: impl Into<String>) -> ResponseTemplate {
    let body: String = body.into();
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}
