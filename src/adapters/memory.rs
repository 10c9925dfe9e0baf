use crate::ports::store::{
    AddressRegistry, CollectionSummary, DiagnosticStore, DueWindow, NotificationStore, StoreResult,
};
use crate::types::notification::{DeliveryRecord, Notification, NotificationStatus};
use crate::types::registration::Registration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

pub const RECIPIENTS_COLLECTION: &str = "recipients";
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";
pub const REGISTRATIONS_COLLECTION: &str = "registrations";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
}

impl Dataset {
    fn notification_mut(&mut self, id: &str) -> Option<&mut Notification> {
        self.notifications.iter_mut().find(|n| n.id == id)
    }

    fn recipient_ids(&self) -> BTreeSet<String> {
        self.notifications
            .iter()
            .map(|n| n.recipient_id.clone())
            .chain(self.registrations.iter().map(|r| r.recipient_id.clone()))
            .collect()
    }
}

/// Document store held in process memory. Each operation runs under one
/// lock, which gives single-document atomic updates.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Dataset>>,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            data: Arc::new(Mutex::new(dataset)),
        }
    }

    pub fn snapshot(&self) -> Dataset {
        self.data.lock().expect("store lock").clone()
    }

    /// Swaps in a whole dataset, e.g. one already written to disk.
    pub(crate) fn replace(&self, dataset: Dataset) {
        *self.data.lock().expect("store lock") = dataset;
    }

    pub fn insert_notification(&self, notification: Notification) {
        self.data
            .lock()
            .expect("store lock")
            .notifications
            .push(notification);
    }

    pub fn insert_registration(&self, registration: Registration) {
        self.data
            .lock()
            .expect("store lock")
            .registrations
            .push(registration);
    }

    pub fn notification(&self, id: &str) -> Option<Notification> {
        self.data
            .lock()
            .expect("store lock")
            .notifications
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    pub(crate) fn due_now(&self, window: DueWindow) -> Vec<Notification> {
        let data = self.data.lock().expect("store lock");
        data.notifications
            .iter()
            .filter(|n| window.admits(n))
            .cloned()
            .collect()
    }

    pub(crate) fn claim_now(&self, id: &str, at: OffsetDateTime, stale_before: OffsetDateTime) -> bool {
        let mut data = self.data.lock().expect("store lock");
        match data.notification_mut(id) {
            Some(n) if n.is_claimable(stale_before) => {
                n.status = NotificationStatus::Dispatching;
                n.claimed_at = Some(at);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn finalize_now(&self, id: &str, record: &DeliveryRecord) -> bool {
        let mut data = self.data.lock().expect("store lock");
        match data.notification_mut(id) {
            Some(n) if n.status == NotificationStatus::Dispatching => {
                n.status = record.status;
                n.delivery = Some(record.clone());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn addresses_now(&self, recipient_id: &str) -> Vec<Registration> {
        let data = self.data.lock().expect("store lock");
        data.registrations
            .iter()
            .filter(|r| r.recipient_id == recipient_id)
            .cloned()
            .collect()
    }

    pub(crate) fn remove_now(&self, recipient_id: &str, address: &str) -> bool {
        let mut data = self.data.lock().expect("store lock");
        let before = data.registrations.len();
        data.registrations
            .retain(|r| !(r.recipient_id == recipient_id && r.address == address));
        data.registrations.len() != before
    }

    pub(crate) fn collections_now(&self) -> Vec<CollectionSummary> {
        let data = self.data.lock().expect("store lock");
        vec![
            CollectionSummary {
                name: RECIPIENTS_COLLECTION,
                count: data.recipient_ids().len(),
            },
            CollectionSummary {
                name: NOTIFICATIONS_COLLECTION,
                count: data.notifications.len(),
            },
            CollectionSummary {
                name: REGISTRATIONS_COLLECTION,
                count: data.registrations.len(),
            },
        ]
    }
}

impl NotificationStore for MemoryStore {
    fn due_notifications(&self, window: DueWindow) -> BoxFuture<'_, StoreResult<Vec<Notification>>> {
        futures::future::ready(Ok(self.due_now(window))).boxed()
    }

    fn claim<'a>(
        &'a self,
        id: &'a str,
        at: OffsetDateTime,
        stale_before: OffsetDateTime,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        futures::future::ready(Ok(self.claim_now(id, at, stale_before))).boxed()
    }

    fn finalize<'a>(
        &'a self,
        id: &'a str,
        record: &'a DeliveryRecord,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        futures::future::ready(Ok(self.finalize_now(id, record))).boxed()
    }
}

impl AddressRegistry for MemoryStore {
    fn addresses_for<'a>(
        &'a self,
        recipient_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Registration>>> {
        futures::future::ready(Ok(self.addresses_now(recipient_id))).boxed()
    }

    fn remove<'a>(
        &'a self,
        recipient_id: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        futures::future::ready(Ok(self.remove_now(recipient_id, address))).boxed()
    }
}

impl DiagnosticStore for MemoryStore {
    fn recipients(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
        let ids = self
            .data
            .lock()
            .expect("store lock")
            .recipient_ids()
            .into_iter()
            .collect();
        futures::future::ready(Ok(ids)).boxed()
    }

    fn notifications(&self) -> BoxFuture<'_, StoreResult<Vec<Notification>>> {
        futures::future::ready(Ok(self.snapshot().notifications)).boxed()
    }

    fn registrations(&self) -> BoxFuture<'_, StoreResult<Vec<Registration>>> {
        futures::future::ready(Ok(self.snapshot().registrations)).boxed()
    }

    fn collections(&self) -> BoxFuture<'_, StoreResult<Vec<CollectionSummary>>> {
        futures::future::ready(Ok(self.collections_now())).boxed()
    }
}
