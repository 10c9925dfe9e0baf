use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const NOTE_NO_ADDRESSES: &str = "no registered addresses";
pub const NOTE_FALLBACK_OTHER: &str = "no exact device match, delivered broadly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    /// Claimed by a running cycle; not yet terminal.
    Dispatching,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub event_id: String,
    pub event_name: String,
    pub date_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub fire_at: OffsetDateTime,
    pub status: NotificationStatus,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub payload: EventPayload,
    /// Device the notification was created on, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub claimed_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryRecord>,
}

impl Notification {
    /// Pending, or dispatching under a claim taken before `stale_before`.
    /// A dispatching notification without a claim time counts as abandoned.
    pub fn is_claimable(&self, stale_before: OffsetDateTime) -> bool {
        match self.status {
            NotificationStatus::Pending => true,
            NotificationStatus::Dispatching => self
                .claimed_at
                .is_none_or(|claimed_at| claimed_at < stale_before),
            NotificationStatus::Sent | NotificationStatus::Failed => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTarget {
    OriginatingDevice,
    FallbackOther,
    Broadcast,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub status: NotificationStatus,
    pub target: DeliveryTarget,
    pub success_count: u32,
    pub failure_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_to_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

impl DeliveryRecord {
    pub fn failed(target: DeliveryTarget, error: String, completed_at: OffsetDateTime) -> Self {
        Self {
            status: NotificationStatus::Failed,
            target,
            success_count: 0,
            failure_count: 0,
            sent_to_device: None,
            note: None,
            error: Some(error),
            completed_at,
        }
    }

    pub fn without_addresses(completed_at: OffsetDateTime) -> Self {
        Self {
            status: NotificationStatus::Sent,
            target: DeliveryTarget::None,
            success_count: 0,
            failure_count: 0,
            sent_to_device: None,
            note: Some(NOTE_NO_ADDRESSES.to_string()),
            error: None,
            completed_at,
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notification__should_deserialize_without_optional_fields() {
        // Given
        let value = json!({
            "id": "n1",
            "recipient_id": "r1",
            "fire_at": "2025-01-12T09:30:00Z",
            "status": "pending",
            "title": "Standup",
            "body": "Starts in 5 minutes"
        });

        // When
        let notification: Notification = serde_json::from_value(value).expect("parse");

        // Then
        assert_eq!(notification.status, NotificationStatus::Pending);
        assert!(notification.device_id.is_none());
        assert!(notification.delivery.is_none());
        assert_eq!(notification.payload, EventPayload::default());
    }

    #[test]
    fn status__should_only_treat_sent_and_failed_as_terminal() {
        assert!(!NotificationStatus::Pending.is_terminal());
        assert!(!NotificationStatus::Dispatching.is_terminal());
        assert!(NotificationStatus::Sent.is_terminal());
        assert!(NotificationStatus::Failed.is_terminal());
    }

    #[test]
    fn is_claimable__should_take_over_only_abandoned_claims() {
        // Given
        let cutoff = OffsetDateTime::UNIX_EPOCH + time::Duration::minutes(10);
        let value = json!({
            "id": "n1",
            "recipient_id": "r1",
            "fire_at": "1970-01-01T00:00:00Z",
            "status": "dispatching",
            "title": "Standup",
            "body": "Starts in 5 minutes"
        });
        let mut notification: Notification = serde_json::from_value(value).expect("parse");

        // Then
        assert!(notification.is_claimable(cutoff));
        notification.claimed_at = Some(cutoff - time::Duration::seconds(1));
        assert!(notification.is_claimable(cutoff));
        notification.claimed_at = Some(cutoff);
        assert!(!notification.is_claimable(cutoff));
        notification.status = NotificationStatus::Sent;
        assert!(!notification.is_claimable(cutoff));
    }
}
