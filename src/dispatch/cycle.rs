use crate::config::DispatchSettings;
use crate::dispatch::cleanup::CleanupQueue;
use crate::dispatch::due_set::{self, RecipientGroup};
use crate::dispatch::reconcile::{FinalizeBacklog, Reconciler};
use crate::dispatch::registry;
use crate::dispatch::routing::Router;
use crate::error::DispatchError;
use crate::ports::store::DueWindow;
use crate::ports::{AddressRegistry, NotificationStore, PushGateway, TimeProvider};

use futures::StreamExt;
use std::sync::Arc;

/// Store and gateway handles shared by every cycle.
#[derive(Clone)]
pub struct DispatchContext {
    pub notifications: Arc<dyn NotificationStore>,
    pub registry: Arc<dyn AddressRegistry>,
    pub gateway: Arc<dyn PushGateway>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Successful per-address deliveries across all attempts.
    pub sent: u32,
    pub recipients: usize,
    pub notifications: usize,
    /// Notifications another dispatcher claimed first.
    pub skipped: usize,
    pub failed_recipients: usize,
    /// Deferred delivery records written back at the start of the cycle.
    pub recovered: usize,
}

#[derive(Debug, Default)]
struct GroupOutcome {
    sent: u32,
    processed: usize,
    skipped: usize,
    error: Option<DispatchError>,
}

pub struct Dispatcher<T> {
    context: DispatchContext,
    cleanup: CleanupQueue,
    time: T,
    settings: DispatchSettings,
    backlog: FinalizeBacklog,
    lease: tokio::sync::Mutex<()>,
}

impl<T: TimeProvider> Dispatcher<T> {
    pub fn new(
        context: DispatchContext,
        cleanup: CleanupQueue,
        time: T,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            context,
            cleanup,
            time,
            settings,
            backlog: FinalizeBacklog::default(),
            lease: tokio::sync::Mutex::new(()),
        }
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    pub fn cleanup(&self) -> &CleanupQueue {
        &self.cleanup
    }

    /// Runs one dispatch pass. Only a failure to determine the due set, or an
    /// overlapping pass, is returned as an error.
    pub async fn run_cycle(&self) -> Result<CycleReport, DispatchError> {
        let _lease = self
            .lease
            .try_lock()
            .map_err(|_| DispatchError::CycleInProgress)?;

        let recovered = self.retry_deferred().await;
        let window = DueWindow::ending_at(
            self.time.now(),
            self.settings.lookback,
            self.settings.stale_claim_timeout,
        );
        let groups = due_set::resolve(self.context.notifications.as_ref(), window, |id| {
            self.backlog.contains(id)
        })
        .await
        .inspect_err(|err| tracing::error!(error = %err, "failed to resolve due notifications"))?;

        let mut report = CycleReport {
            recipients: groups.len(),
            recovered,
            ..Default::default()
        };
        if groups.is_empty() {
            tracing::debug!("no due notifications");
            return Ok(report);
        }

        let concurrency = self.settings.recipient_concurrency.max(1);
        let outcomes: Vec<(String, GroupOutcome)> = futures::stream::iter(groups)
            .map(|group| self.process_recipient(group, window))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for (recipient_id, outcome) in outcomes {
            report.sent += outcome.sent;
            report.notifications += outcome.processed;
            report.skipped += outcome.skipped;
            if let Some(err) = outcome.error {
                report.failed_recipients += 1;
                tracing::error!(
                    recipient = %recipient_id,
                    error = %err,
                    "failed to process recipient notifications"
                );
            }
        }

        tracing::info!(
            sent = report.sent,
            recipients = report.recipients,
            notifications = report.notifications,
            skipped = report.skipped,
            failed_recipients = report.failed_recipients,
            recovered = report.recovered,
            "dispatch cycle finished"
        );
        Ok(report)
    }

    /// Writes back delivery records whose finalize failed in an earlier cycle.
    /// Records that fail again stay in the backlog.
    async fn retry_deferred(&self) -> usize {
        let store = self.context.notifications.as_ref();
        let mut recovered = 0;
        for (id, record) in self.backlog.take() {
            match store.finalize(&id, &record).await {
                Ok(true) => {
                    tracing::info!(notification = %id, "deferred delivery record written");
                    recovered += 1;
                }
                Ok(false) => {
                    tracing::warn!(
                        notification = %id,
                        "notification left the dispatching state; deferred record dropped"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        notification = %id,
                        error = %err,
                        "deferred delivery record still cannot be written"
                    );
                    self.backlog.defer(&id, record);
                }
            }
        }
        recovered
    }

    async fn process_recipient(
        &self,
        group: RecipientGroup,
        window: DueWindow,
    ) -> (String, GroupOutcome) {
        let mut outcome = GroupOutcome::default();
        if let Err(err) = self.process_group(&group, window, &mut outcome).await {
            outcome.error = Some(err);
        }
        (group.recipient_id, outcome)
    }

    async fn process_group(
        &self,
        group: &RecipientGroup,
        window: DueWindow,
        outcome: &mut GroupOutcome,
    ) -> Result<(), DispatchError> {
        let mut addresses =
            registry::load(self.context.registry.as_ref(), &group.recipient_id).await?;
        let store = self.context.notifications.as_ref();
        let router = Router {
            gateway: self.context.gateway.as_ref(),
            reconciler: Reconciler {
                store,
                cleanup: &self.cleanup,
                backlog: &self.backlog,
                time: &self.time,
            },
            android_channel_id: &self.settings.android_channel_id,
        };

        for notification in &group.notifications {
            // A failed claim leaves the notification as the store reports it.
            if !store
                .claim(&notification.id, self.time.now(), window.stale_before)
                .await?
            {
                tracing::debug!(notification = %notification.id, "notification already claimed");
                outcome.skipped += 1;
                continue;
            }

            let result = router.route(notification, &addresses).await;
            outcome.sent += result.sent;
            outcome.processed += 1;
            addresses.forget(&result.pruned);
            if let Some(err) = result.deferred {
                tracing::warn!(
                    notification = %notification.id,
                    error = %err,
                    "delivery record deferred; finalize will be retried next cycle"
                );
                return Err(err.into());
            }
        }
        Ok(())
    }
}
