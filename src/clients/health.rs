use std::{collections::HashMap, time::Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    center::NotificationCenter,
    clients::storage::SessionStorage,
    models::health::{HealthCheckResponse, HealthStatus, ServiceHealth},
};

pub struct HealthChecker;

impl HealthChecker {
    pub async fn check_all<S: SessionStorage>(center: &NotificationCenter<S>) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        let stream_health = Self::check_event_stream(center).await;
        checks.insert("event_stream".to_string(), stream_health);

        let storage_health = Self::check_session_storage(center).await;
        checks.insert("session_storage".to_string(), storage_health);

        let overall_status = Self::determine_overall_status(&checks);

        HealthCheckResponse {
            status: overall_status,
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            checks,
        }
    }

    async fn check_event_stream<S: SessionStorage>(center: &NotificationCenter<S>) -> ServiceHealth {
        let Some(subscriber) = center.subscriber().await else {
            return ServiceHealth::degraded("No subscriber".to_string());
        };

        if center.is_connected().await {
            ServiceHealth::healthy(0).with_subscriber(subscriber.to_string())
        } else {
            debug!(subscriber = %subscriber, "Notification channel is closed");
            ServiceHealth::degraded("Notification channel closed".to_string())
                .with_subscriber(subscriber.to_string())
        }
    }

    async fn check_session_storage<S: SessionStorage>(
        center: &NotificationCenter<S>,
    ) -> ServiceHealth {
        let start = Instant::now();

        match center.storage_health().await {
            Ok(_) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "Session storage health check passed");
                ServiceHealth::healthy(elapsed)
            }
            Err(e) => {
                warn!(error = %e, "Session storage health check failed");
                ServiceHealth::unhealthy(format!("Health check failed: {}", e))
            }
        }
    }

    fn determine_overall_status(checks: &HashMap<String, ServiceHealth>) -> HealthStatus {
        let has_unhealthy = checks
            .values()
            .any(|health| health.status == HealthStatus::Unhealthy);

        let has_degraded = checks
            .values()
            .any(|health| health.status == HealthStatus::Degraded);

        if has_unhealthy {
            HealthStatus::Unhealthy
        } else if has_degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}
