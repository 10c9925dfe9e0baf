use crate::adapters::MemoryStore;
use crate::config::DispatchSettings;
use crate::dispatch::cleanup::CleanupQueue;
use crate::dispatch::cycle::{DispatchContext, Dispatcher};
use crate::error::{GatewayError, StoreError};
use crate::ports::store::{DueWindow, StoreResult};
use crate::ports::{AddressRegistry, NotificationStore, PushGateway, TimeProvider};
use crate::types::delivery::{AddressOutcome, BatchReport, PushMessage};
use crate::types::notification::{
    DeliveryRecord, EventPayload, Notification, NotificationStatus,
};
use crate::types::registration::Registration;

use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::oneshot;

pub(crate) fn now() -> OffsetDateTime {
    datetime!(2025-01-12 09:30:00 UTC)
}

pub(crate) fn create_temp_root(test_name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("dispatchd-{test_name}-{nanos}"));
    std::fs::create_dir_all(&root).expect("create temp root");
    root
}

pub(crate) fn notification(
    id: &str,
    recipient_id: &str,
    fire_at: OffsetDateTime,
    device_id: Option<&str>,
) -> Notification {
    Notification {
        id: id.to_string(),
        recipient_id: recipient_id.to_string(),
        fire_at,
        status: NotificationStatus::Pending,
        title: format!("Reminder {id}"),
        body: "Your event starts soon".to_string(),
        payload: EventPayload {
            event_id: format!("event-{id}"),
            event_name: "Standup".to_string(),
            date_key: "2025-01-12".to_string(),
        },
        device_id: device_id.map(str::to_string),
        claimed_at: None,
        delivery: None,
    }
}

pub(crate) fn registration(recipient_id: &str, address: &str, device_id: Option<&str>) -> Registration {
    Registration {
        recipient_id: recipient_id.to_string(),
        address: address.to_string(),
        device_id: device_id.map(str::to_string),
        registered_at: None,
    }
}

pub(crate) fn dispatcher(store: &MemoryStore, gateway: &ScriptedGateway) -> Dispatcher<TestTime> {
    dispatcher_with(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        gateway,
        TestTime::new(now()),
    )
}

pub(crate) fn dispatcher_with(
    notifications: Arc<dyn NotificationStore>,
    registry: Arc<dyn AddressRegistry>,
    gateway: &ScriptedGateway,
    time: TestTime,
) -> Dispatcher<TestTime> {
    let (cleanup, _worker) = CleanupQueue::spawn(Arc::clone(&registry));
    let context = DispatchContext {
        notifications,
        registry,
        gateway: Arc::new(gateway.clone()),
    };
    Dispatcher::new(context, cleanup, time, DispatchSettings::default())
}

#[derive(Clone)]
pub(crate) struct TestTime {
    now: OffsetDateTime,
    sleeps: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
    durations: Arc<Mutex<Vec<Duration>>>,
}

impl TestTime {
    pub(crate) fn new(now: OffsetDateTime) -> Self {
        Self {
            now,
            sleeps: Arc::new(Mutex::new(Vec::new())),
            durations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn sleep_durations(&self) -> Vec<Duration> {
        self.durations.lock().expect("durations lock").clone()
    }

    pub(crate) fn trigger_all(&self) {
        let mut sends = self.sleeps.lock().expect("sleeps lock");
        for sender in sends.drain(..) {
            let _ = sender.send(());
        }
    }
}

pub(crate) struct ManualSleep {
    receiver: oneshot::Receiver<()>,
}

impl Future for ManualSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl TimeProvider for TestTime {
    type Sleep<'a>
        = ManualSleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        self.now
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        let (sender, receiver) = oneshot::channel();
        self.durations
            .lock()
            .expect("durations lock")
            .push(duration);
        self.sleeps.lock().expect("sleeps lock").push(sender);
        ManualSleep { receiver }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
    /// Per-address outcomes, failing only rejected addresses.
    Deliver,
    /// Whole call fails.
    Outage,
}

/// Gateway double that records every target list and answers from a script,
/// defaulting to [`Reply::Deliver`].
#[derive(Clone, Default)]
pub(crate) struct ScriptedGateway {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    script: Arc<Mutex<VecDeque<Reply>>>,
    rejected: Arc<HashSet<String>>,
}

impl ScriptedGateway {
    pub(crate) fn script(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.script
            .lock()
            .expect("script lock")
            .extend(replies);
        self
    }

    pub(crate) fn rejecting(mut self, addresses: &[&str]) -> Self {
        self.rejected = Arc::new(addresses.iter().map(|a| a.to_string()).collect());
        self
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl PushGateway for ScriptedGateway {
    fn send_batch<'a>(
        &'a self,
        _message: &'a PushMessage,
        targets: &'a [String],
    ) -> BoxFuture<'a, Result<BatchReport, GatewayError>> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(targets.to_vec());
        let reply = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Reply::Deliver);
        let result = match reply {
            Reply::Outage => Err(GatewayError::Auth("scripted outage".to_string())),
            Reply::Deliver => Ok(BatchReport::from_outcomes(
                targets
                    .iter()
                    .map(|address| {
                        if self.rejected.contains(address) {
                            AddressOutcome::rejected(address, "registration-token-not-registered")
                        } else {
                            AddressOutcome::delivered(address)
                        }
                    })
                    .collect(),
            )),
        };
        futures::future::ready(result).boxed()
    }
}

/// Registry wrapper that fails lookups for chosen recipients or every removal.
#[derive(Clone)]
pub(crate) struct FailingRegistry {
    inner: MemoryStore,
    failing_lookups: HashSet<String>,
    fail_removals: bool,
}

impl FailingRegistry {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing_lookups: HashSet::new(),
            fail_removals: false,
        }
    }

    pub(crate) fn fail_lookups_for(mut self, recipient_id: &str) -> Self {
        self.failing_lookups.insert(recipient_id.to_string());
        self
    }

    pub(crate) fn fail_removals(mut self) -> Self {
        self.fail_removals = true;
        self
    }
}

impl AddressRegistry for FailingRegistry {
    fn addresses_for<'a>(
        &'a self,
        recipient_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Registration>>> {
        if self.failing_lookups.contains(recipient_id) {
            return futures::future::ready(Err(StoreError::Unavailable(
                "registry offline".to_string(),
            )))
            .boxed();
        }
        self.inner.addresses_for(recipient_id)
    }

    fn remove<'a>(
        &'a self,
        recipient_id: &'a str,
        address: &'a str,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        if self.fail_removals {
            return futures::future::ready(Err(StoreError::Unavailable(
                "registry read-only".to_string(),
            )))
            .boxed();
        }
        self.inner.remove(recipient_id, address)
    }
}

/// Notification store whose every call fails.
pub(crate) struct FailingStore;

impl FailingStore {
    fn error<T: Send + 'static>() -> BoxFuture<'static, StoreResult<T>> {
        futures::future::ready(Err(StoreError::Unavailable("store offline".to_string()))).boxed()
    }
}

impl NotificationStore for FailingStore {
    fn due_notifications(&self, _window: DueWindow) -> BoxFuture<'_, StoreResult<Vec<Notification>>> {
        Self::error()
    }

    fn claim<'a>(
        &'a self,
        _id: &'a str,
        _at: OffsetDateTime,
        _stale_before: OffsetDateTime,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        Self::error()
    }

    fn finalize<'a>(
        &'a self,
        _id: &'a str,
        _record: &'a DeliveryRecord,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        Self::error()
    }
}

/// Simulates a second dispatcher claiming `contested` right after the due
/// set was read.
pub(crate) struct RacingStore {
    inner: MemoryStore,
    contested: String,
}

impl RacingStore {
    pub(crate) fn new(inner: MemoryStore, contested: &str) -> Self {
        Self {
            inner,
            contested: contested.to_string(),
        }
    }
}

impl NotificationStore for RacingStore {
    fn due_notifications(&self, window: DueWindow) -> BoxFuture<'_, StoreResult<Vec<Notification>>> {
        let due = self.inner.due_now(window);
        self.inner
            .claim_now(&self.contested, window.end, window.stale_before);
        futures::future::ready(Ok(due)).boxed()
    }

    fn claim<'a>(
        &'a self,
        id: &'a str,
        at: OffsetDateTime,
        stale_before: OffsetDateTime,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        self.inner.claim(id, at, stale_before)
    }

    fn finalize<'a>(
        &'a self,
        id: &'a str,
        record: &'a DeliveryRecord,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        self.inner.finalize(id, record)
    }
}

/// Notification store that fails the next `n` claims or finalizes, then
/// behaves like the wrapped store.
#[derive(Clone)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    claim_failures: Arc<AtomicUsize>,
    finalize_failures: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            claim_failures: Arc::new(AtomicUsize::new(0)),
            finalize_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn fail_claims(self, n: usize) -> Self {
        self.claim_failures.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn fail_finalizes(self, n: usize) -> Self {
        self.finalize_failures.store(n, Ordering::SeqCst);
        self
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }

    fn error<T: Send + 'static>(what: &str) -> BoxFuture<'static, StoreResult<T>> {
        futures::future::ready(Err(StoreError::Unavailable(format!("{what} rejected")))).boxed()
    }
}

impl NotificationStore for FlakyStore {
    fn due_notifications(&self, window: DueWindow) -> BoxFuture<'_, StoreResult<Vec<Notification>>> {
        self.inner.due_notifications(window)
    }

    fn claim<'a>(
        &'a self,
        id: &'a str,
        at: OffsetDateTime,
        stale_before: OffsetDateTime,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        if Self::take_failure(&self.claim_failures) {
            return Self::error("claim");
        }
        self.inner.claim(id, at, stale_before)
    }

    fn finalize<'a>(
        &'a self,
        id: &'a str,
        record: &'a DeliveryRecord,
    ) -> BoxFuture<'a, StoreResult<bool>> {
        if Self::take_failure(&self.finalize_failures) {
            return Self::error("finalize");
        }
        self.inner.finalize(id, record)
    }
}
