use crate::error::StoreError;
use crate::types::notification::{DeliveryRecord, Notification, NotificationStatus};
use crate::types::registration::Registration;

use futures::future::BoxFuture;
use serde::Serialize;
use std::time::Duration;
use time::OffsetDateTime;

pub type StoreResult<T> = Result<T, StoreError>;

/// Selection bounds of one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    /// Claims taken before this instant are abandoned and may be taken over.
    pub stale_before: OffsetDateTime,
}

impl DueWindow {
    pub fn ending_at(now: OffsetDateTime, lookback: Duration, stale_claim_timeout: Duration) -> Self {
        Self {
            start: now - lookback,
            end: now,
            stale_before: now - stale_claim_timeout,
        }
    }

    /// Pending notifications fired inside `[start, end]`, plus abandoned
    /// claims of any fire time up to `end`.
    pub fn admits(&self, notification: &Notification) -> bool {
        if notification.fire_at > self.end {
            return false;
        }
        match notification.status {
            NotificationStatus::Pending => notification.fire_at >= self.start,
            _ => notification.is_claimable(self.stale_before),
        }
    }
}

/// Notification documents. Every write is a single-document atomic update.
pub trait NotificationStore: Send + Sync + 'static {
    /// Notifications admitted by `window`, in store order.
    fn due_notifications(&self, window: DueWindow) -> BoxFuture<'_, StoreResult<Vec<Notification>>>;

    /// Moves a claimable notification to `dispatching` stamped with `at`.
    /// Returns `false` when it was no longer claimable.
    fn claim<'a>(
        &'a self,
        id: &'a str,
        at: OffsetDateTime,
        stale_before: OffsetDateTime,
    ) -> BoxFuture<'a, StoreResult<bool>>;

    /// Moves `dispatching -> record.status` and attaches the record. Returns
    /// `false` when the notification was not in the dispatching state.
    fn finalize<'a>(
        &'a self,
        id: &'a str,
        record: &'a DeliveryRecord,
    ) -> BoxFuture<'a, StoreResult<bool>>;
}

pub trait AddressRegistry: Send + Sync + 'static {
    fn addresses_for<'a>(
        &'a self,
        recipient_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Registration>>>;

    /// Returns `false` when the address was already gone.
    fn remove<'a>(
        &'a self,
        recipient_id: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub name: &'static str,
    pub count: usize,
}

/// Read-only views for the diagnostic surface.
pub trait DiagnosticStore: Send + Sync + 'static {
    fn recipients(&self) -> BoxFuture<'_, StoreResult<Vec<String>>>;
    fn notifications(&self) -> BoxFuture<'_, StoreResult<Vec<Notification>>>;
    fn registrations(&self) -> BoxFuture<'_, StoreResult<Vec<Registration>>>;
    fn collections(&self) -> BoxFuture<'_, StoreResult<Vec<CollectionSummary>>>;
}
