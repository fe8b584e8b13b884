use tracing::{error, info, warn};

use crate::models::notification::NotificationKind;

/// Presentation collaborator that surfaces a transient alert for each delivered
/// notification.
pub trait Toaster: Send + Sync {
    fn show(&self, message: &str, kind: NotificationKind);
}

/// Renders toasts as log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingToaster;

impl Toaster for TracingToaster {
    fn show(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Error => error!(toast = message, kind = %kind, "Notification"),
            NotificationKind::Warning => warn!(toast = message, kind = %kind, "Notification"),
            NotificationKind::Info | NotificationKind::Success => {
                info!(toast = message, kind = %kind, "Notification")
            }
        }
    }
}
