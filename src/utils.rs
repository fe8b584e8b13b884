use anyhow::{Error, Result, anyhow};
use serde_json::Value as JsonValue;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::{
    clients::{storage::SessionStorage, toast::Toaster},
    models::{
        event::{CONNECTED_EVENT, NOTIFICATION_EVENT, SseFrame},
        notification::{Notification, NotificationPayload},
        retry::RetryConfig,
    },
    store::SharedStore,
};

/// Handles one decoded push frame. Returns the notification it stored, if any.
///
/// Malformed payloads are logged and dropped; nothing here fails the channel.
pub async fn process_frame<S: SessionStorage>(
    frame: &SseFrame,
    store: &SharedStore<S>,
    toaster: &dyn Toaster,
) -> Option<Notification> {
    match frame.event.as_str() {
        NOTIFICATION_EVENT => {
            let payload = match decode_notification(&frame.data) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        error = %e,
                        event_id = ?frame.id,
                        "Dropping malformed notification frame"
                    );
                    return None;
                }
            };

            let notification = payload.into_notification();

            info!(
                id = %notification.id,
                kind = %notification.kind,
                "Notification received"
            );

            if !store.lock().await.append(notification.clone()).await {
                return None;
            }

            toaster.show(&notification.message, notification.kind);
            Some(notification)
        }
        CONNECTED_EVENT => {
            info!(data = %frame.data, "Notification channel acknowledged");
            None
        }
        other => {
            debug!(event = other, "Ignoring unhandled push event");
            None
        }
    }
}

pub fn decode_notification(data: &str) -> Result<NotificationPayload, Error> {
    let value = serde_json::from_str::<JsonValue>(data)
        .map_err(|e| anyhow!("Invalid notification payload: {}", e))?;

    if !value.is_object() {
        return Err(anyhow!("Notification payload must be a JSON object"));
    }

    let payload = serde_json::from_value::<NotificationPayload>(value)
        .map_err(|e| anyhow!("Invalid notification payload: {}", e))?;

    Ok(payload)
}

pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay_ms = config.initial_delay_ms;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(
                        attempt,
                        max_attempts = config.max_attempts,
                        "Operation succeeded after retrying"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt >= config.max_attempts {
                    warn!(
                        max_attempts = config.max_attempts,
                        error = %e,
                        "Giving up after exhausting retry attempts"
                    );
                    return Err(e);
                }

                debug!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms,
                    "Retry attempt failed, backing off"
                );

                let jitter: f64 = rand::random_range(-0.1..=0.1);
                sleep(Duration::from_millis((delay_ms as f64 * (1.0 + jitter)) as u64)).await;

                delay_ms = (delay_ms * config.backoff_multiplier).min(config.max_delay_ms);
            }
        }
    }
}
