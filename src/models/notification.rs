use std::fmt::{Display, Formatter, Result as FmtResult};

use anyhow::{Error, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub const DEFAULT_MESSAGE: &str = "New notification";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn from_tag(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => NotificationKind::Success,
            "warning" => NotificationKind::Warning,
            "error" => NotificationKind::Error,
            _ => NotificationKind::Info,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        NotificationKind::from_tag(&value)
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    pub fn new(id: impl Into<String>, message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            id: id.into(),
            timestamp: now_rfc3339(),
            message: message.into(),
            kind,
            read: false,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }
}

/// Body of a `notification` push frame. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub id: Option<JsonValue>,
    #[serde(default)]
    pub timestamp: Option<JsonValue>,
    #[serde(default)]
    pub message: Option<JsonValue>,
    #[serde(default)]
    pub title: Option<JsonValue>,
    #[serde(rename = "type", default)]
    pub kind: Option<JsonValue>,
}

impl NotificationPayload {
    pub fn into_notification(self) -> Notification {
        let id = match self.id {
            Some(JsonValue::String(s)) if !s.is_empty() => s,
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let message = non_empty_text(self.message)
            .or_else(|| non_empty_text(self.title))
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

        let kind = match self.kind {
            Some(JsonValue::String(tag)) => NotificationKind::from_tag(&tag),
            _ => NotificationKind::Info,
        };

        Notification {
            id,
            timestamp: wire_timestamp(self.timestamp).unwrap_or_else(now_rfc3339),
            message,
            kind,
            read: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn parse(value: impl ToString) -> Result<Self, Error> {
        let value = value.to_string();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Subscriber id cannot be empty"));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SubscriberId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

fn non_empty_text(value: Option<JsonValue>) -> Option<String> {
    match value {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Strings pass through as sent; numbers are epoch milliseconds.
fn wire_timestamp(value: Option<JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(s),
        JsonValue::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::<Utc>::from_timestamp_millis(millis)
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        _ => None,
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
