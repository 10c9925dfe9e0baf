use crate::types::notification::Notification;

use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_ANDROID_CHANNEL_ID: &str = "reminders";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Gateway data values must be strings.
    pub data: BTreeMap<String, String>,
    pub android: AndroidHints,
    pub apns: ApnsHints,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AndroidHints {
    pub priority: &'static str,
    pub channel_id: String,
    pub sound: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApnsHints {
    pub priority: &'static str,
    pub sound: &'static str,
    pub badge: u32,
}

impl PushMessage {
    pub fn for_notification(notification: &Notification, android_channel_id: &str) -> Self {
        let mut data = BTreeMap::new();
        data.insert("notification_id".to_string(), notification.id.clone());
        data.insert(
            "event_id".to_string(),
            notification.payload.event_id.clone(),
        );
        data.insert(
            "event_name".to_string(),
            notification.payload.event_name.clone(),
        );
        data.insert(
            "date_key".to_string(),
            notification.payload.date_key.clone(),
        );

        Self {
            title: notification.title.clone(),
            body: notification.body.clone(),
            data,
            android: AndroidHints {
                priority: "high",
                channel_id: android_channel_id.to_string(),
                sound: "default",
            },
            apns: ApnsHints {
                priority: "10",
                sound: "default",
                badge: 1,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressOutcome {
    pub address: String,
    /// `None` when the gateway accepted the message for this address.
    pub error: Option<String>,
}

impl AddressOutcome {
    pub fn delivered(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            error: None,
        }
    }

    pub fn rejected(address: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<AddressOutcome>,
    pub success_count: u32,
    pub failure_count: u32,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<AddressOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.is_success()).count() as u32;
        let failure_count = outcomes.len() as u32 - success_count;
        Self {
            outcomes,
            success_count,
            failure_count,
        }
    }

    pub fn failed_addresses(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .map(|outcome| outcome.address.as_str())
    }
}
