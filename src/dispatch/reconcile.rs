use crate::dispatch::cleanup::CleanupQueue;
use crate::error::GatewayError;
use crate::ports::store::StoreResult;
use crate::ports::{NotificationStore, TimeProvider};
use crate::types::delivery::BatchReport;
use crate::types::notification::{
    DeliveryRecord, DeliveryTarget, Notification, NotificationStatus,
};

use std::sync::Mutex;

/// Delivery records whose finalize failed after the attempt was made.
///
/// Their notifications stay `dispatching` and are not claimed again while
/// held here. The next cycle retries the finalize instead of the send.
#[derive(Debug, Default)]
pub(crate) struct FinalizeBacklog {
    records: Mutex<Vec<(String, DeliveryRecord)>>,
}

impl FinalizeBacklog {
    pub(crate) fn defer(&self, id: &str, record: DeliveryRecord) {
        let mut records = self.records.lock().expect("backlog lock");
        records.retain(|(held, _)| held != id);
        records.push((id.to_string(), record));
    }

    pub(crate) fn take(&self) -> Vec<(String, DeliveryRecord)> {
        std::mem::take(&mut *self.records.lock().expect("backlog lock"))
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.records
            .lock()
            .expect("backlog lock")
            .iter()
            .any(|(held, _)| held == id)
    }
}

/// Applies delivery outcomes to the notification and the address registry.
pub(crate) struct Reconciler<'a, T> {
    pub(crate) store: &'a dyn NotificationStore,
    pub(crate) cleanup: &'a CleanupQueue,
    pub(crate) backlog: &'a FinalizeBacklog,
    pub(crate) time: &'a T,
}

impl<T: TimeProvider> Reconciler<'_, T> {
    pub(crate) async fn no_addresses(&self, notification: &Notification) -> StoreResult<()> {
        let record = DeliveryRecord::without_addresses(self.time.now());
        self.finish(notification, &record).await
    }

    pub(crate) async fn wholesale_failure(
        &self,
        notification: &Notification,
        target: DeliveryTarget,
        error: &GatewayError,
    ) -> StoreResult<()> {
        let record = DeliveryRecord::failed(target, error.to_string(), self.time.now());
        self.finish(notification, &record).await
    }

    /// Records a completed attempt as `sent`.
    pub(crate) async fn delivered(
        &self,
        notification: &Notification,
        report: &BatchReport,
        target: DeliveryTarget,
        note: Option<&str>,
    ) -> StoreResult<()> {
        let sent_to_device = match target {
            DeliveryTarget::OriginatingDevice => notification.device_id.clone(),
            _ => None,
        };
        let record = DeliveryRecord {
            status: NotificationStatus::Sent,
            target,
            success_count: report.success_count,
            failure_count: report.failure_count,
            sent_to_device,
            note: note.map(str::to_string),
            error: None,
            completed_at: self.time.now(),
        };
        self.finish(notification, &record).await
    }

    /// Queues every failed address in `report` for deletion.
    pub(crate) fn prune(&self, notification: &Notification, report: &BatchReport) -> Vec<String> {
        report
            .failed_addresses()
            .map(|address| {
                tracing::warn!(
                    recipient = %notification.recipient_id,
                    notification = %notification.id,
                    address,
                    "gateway rejected address; queueing removal"
                );
                self.cleanup.enqueue(&notification.recipient_id, address);
                address.to_string()
            })
            .collect()
    }

    /// Writes the terminal record, deferring it to the backlog when the store
    /// rejects the write.
    async fn finish(&self, notification: &Notification, record: &DeliveryRecord) -> StoreResult<()> {
        let applied = match self.store.finalize(&notification.id, record).await {
            Ok(applied) => applied,
            Err(err) => {
                self.backlog.defer(&notification.id, record.clone());
                return Err(err);
            }
        };
        if !applied {
            tracing::warn!(
                notification = %notification.id,
                "notification left the dispatching state before finalize; record dropped"
            );
        }
        Ok(())
    }
}
