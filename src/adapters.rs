use std::time::Duration;

use time::OffsetDateTime;

use crate::ports;

pub mod fcm;
pub mod file;
pub mod memory;

pub use fcm::FcmGateway;
pub use file::FileStore;
pub use memory::MemoryStore;

/// System UTC clock with tokio timers for the periodic ticker.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}
