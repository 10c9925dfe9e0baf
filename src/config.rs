use crate::types::delivery::DEFAULT_ANDROID_CHANNEL_ID;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(60);
pub const DEFAULT_RECIPIENT_CONCURRENCY: usize = 4;
pub const DEFAULT_STALE_CLAIM_TIMEOUT: Duration = Duration::from_secs(300);

/// Service-account credentials for the store and gateway.
#[derive(Clone)]
pub struct Credentials {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub lookback: Duration,
    /// A dispatching claim older than this is treated as abandoned and
    /// taken over by the next cycle.
    pub stale_claim_timeout: Duration,
    pub recipient_concurrency: usize,
    pub android_channel_id: String,
    /// Runs a cycle on this period in-process when set.
    pub interval: Option<Duration>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            stale_claim_timeout: DEFAULT_STALE_CLAIM_TIMEOUT,
            recipient_concurrency: DEFAULT_RECIPIENT_CONCURRENCY,
            android_channel_id: DEFAULT_ANDROID_CHANNEL_ID.to_string(),
            interval: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub trigger_secret: Option<String>,
    pub port: u16,
    pub data_file: PathBuf,
    pub dispatch: DispatchSettings,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials {
                project_id: "demo-project".to_string(),
                client_email: "dispatch@demo-project.iam.gserviceaccount.com".to_string(),
                private_key: String::new(),
            },
            trigger_secret: None,
            port: 3000,
            data_file: "dispatchd.json".into(),
            dispatch: DispatchSettings::default(),
        }
    }
}
