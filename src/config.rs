use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use reqwest::Url;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{retry::RetryConfig, store::UnreadPolicy};

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub notification_api_url: String,
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
    #[serde(default = "default_test_path")]
    pub test_path: String,
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    #[serde(default)]
    pub subscriber_id: Option<String>,

    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,

    #[serde(default = "default_max_notifications")]
    pub max_notifications: usize,
    #[serde(default)]
    pub decrement_unread_on_remove: bool,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: u64,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Self>(vars)
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults for everything except the backend location.
    pub fn new(notification_api_url: impl Into<String>) -> Self {
        Self {
            notification_api_url: notification_api_url.into(),
            stream_path: default_stream_path(),
            test_path: default_test_path(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            subscriber_id: None,
            redis_url: None,
            session_id: default_session_id(),
            session_ttl_seconds: default_session_ttl_seconds(),
            max_notifications: default_max_notifications(),
            decrement_unread_on_remove: false,
            max_retry_attempts: default_max_retry_attempts(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            retry_backoff_multiplier: default_retry_backoff_multiplier(),
            server_port: default_server_port(),
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.notification_api_url.trim().is_empty() {
            return Err(anyhow!("NOTIFICATION_API_URL cannot be empty"));
        }

        self.base_url()?;

        if self.max_retry_attempts == 0 {
            return Err(anyhow!("MAX_RETRY_ATTEMPTS must be at least 1"));
        }

        if self.max_notifications == 0 {
            return Err(anyhow!("MAX_NOTIFICATIONS must be at least 1"));
        }

        Ok(())
    }

    pub fn stream_url(&self, subscriber: &str) -> Result<Url, Error> {
        self.subscriber_url(&self.stream_path, subscriber)
    }

    pub fn test_url(&self, subscriber: &str) -> Result<Url, Error> {
        self.subscriber_url(&self.test_path, subscriber)
    }

    fn base_url(&self) -> Result<Url, Error> {
        let url = Url::parse(self.notification_api_url.trim())
            .map_err(|e| anyhow!("Invalid NOTIFICATION_API_URL: {}", e))?;

        if url.cannot_be_a_base() {
            return Err(anyhow!("NOTIFICATION_API_URL cannot be used as a base URL"));
        }

        Ok(url)
    }

    /// The subscriber id is always a single, percent-encoded path segment.
    fn subscriber_url(&self, path: &str, subscriber: &str) -> Result<Url, Error> {
        let mut url = self.base_url()?;

        url.path_segments_mut()
            .map_err(|_| anyhow!("NOTIFICATION_API_URL cannot be used as a base URL"))?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()))
            .push(subscriber);

        Ok(url)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retry_attempts,
            initial_delay_ms: self.initial_retry_delay_ms,
            max_delay_ms: self.max_retry_delay_ms,
            backoff_multiplier: self.retry_backoff_multiplier,
        }
    }

    pub fn unread_policy(&self) -> UnreadPolicy {
        if self.decrement_unread_on_remove {
            UnreadPolicy::Reconcile
        } else {
            UnreadPolicy::Retain
        }
    }
}

fn default_stream_path() -> String {
    "/api/notifications/stream".to_string()
}

fn default_test_path() -> String {
    "/api/notifications/test".to_string()
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_session_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_session_ttl_seconds() -> u64 {
    86_400
}

fn default_max_notifications() -> usize {
    100
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    100
}

fn default_max_retry_delay_ms() -> u64 {
    2_000
}

fn default_retry_backoff_multiplier() -> u64 {
    2
}

fn default_server_port() -> u16 {
    8090
}
