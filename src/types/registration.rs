use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A push endpoint owned by one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub recipient_id: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub registered_at: Option<OffsetDateTime>,
}

impl Registration {
    pub fn matches_device(&self, device_id: &str) -> bool {
        self.device_id.as_deref() == Some(device_id)
    }
}
