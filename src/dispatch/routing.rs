use crate::dispatch::reconcile::Reconciler;
use crate::dispatch::registry::RecipientAddresses;
use crate::error::{GatewayError, StoreError};
use crate::ports::store::StoreResult;
use crate::ports::{PushGateway, TimeProvider};
use crate::types::delivery::{BatchReport, PushMessage};
use crate::types::notification::{DeliveryTarget, NOTE_FALLBACK_OTHER, Notification};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RoutePlan {
    NoAddresses,
    Broadcast {
        targets: Vec<String>,
    },
    OriginatingDevice {
        targets: Vec<String>,
        fallback: Vec<String>,
    },
    /// Tagged notification whose device has no registered address.
    FallbackOther {
        targets: Vec<String>,
    },
}

pub(crate) fn plan(notification: &Notification, addresses: &RecipientAddresses) -> RoutePlan {
    if addresses.is_empty() {
        return RoutePlan::NoAddresses;
    }
    let Some(device_id) = notification.device_id.as_deref() else {
        return RoutePlan::Broadcast {
            targets: addresses.all(),
        };
    };
    let (matching, other) = addresses.partition(device_id);
    if matching.is_empty() {
        RoutePlan::FallbackOther { targets: other }
    } else {
        RoutePlan::OriginatingDevice {
            targets: matching,
            fallback: other,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RouteResult {
    pub(crate) sent: u32,
    pub(crate) pruned: Vec<String>,
    /// Finalize failure after the attempt was made. The record waits in the
    /// backlog and the notification stays dispatching.
    pub(crate) deferred: Option<StoreError>,
}

impl RouteResult {
    fn finished(outcome: StoreResult<()>) -> Self {
        Self {
            deferred: outcome.err(),
            ..Self::default()
        }
    }

    fn merge(mut self, other: RouteResult) -> Self {
        self.sent += other.sent;
        self.pruned.extend(other.pruned);
        self.deferred = self.deferred.or(other.deferred);
        self
    }
}

pub(crate) struct Router<'a, T> {
    pub(crate) gateway: &'a dyn PushGateway,
    pub(crate) reconciler: Reconciler<'a, T>,
    pub(crate) android_channel_id: &'a str,
}

impl<T: TimeProvider> Router<'_, T> {
    /// Delivers one claimed notification and leaves it terminal, or deferred
    /// when the terminal record could not be written.
    pub(crate) async fn route(
        &self,
        notification: &Notification,
        addresses: &RecipientAddresses,
    ) -> RouteResult {
        let message = PushMessage::for_notification(notification, self.android_channel_id);
        let plan = plan(notification, addresses);
        tracing::debug!(
            recipient = %notification.recipient_id,
            notification = %notification.id,
            ?plan,
            "routing notification"
        );

        match plan {
            RoutePlan::NoAddresses => {
                RouteResult::finished(self.reconciler.no_addresses(notification).await)
            }
            RoutePlan::Broadcast { targets } => {
                self.attempt(notification, &message, &targets, DeliveryTarget::Broadcast, None)
                    .await
            }
            RoutePlan::FallbackOther { targets } => {
                self.attempt(
                    notification,
                    &message,
                    &targets,
                    DeliveryTarget::FallbackOther,
                    Some(NOTE_FALLBACK_OTHER),
                )
                .await
            }
            RoutePlan::OriginatingDevice { targets, fallback } => {
                let target = DeliveryTarget::OriginatingDevice;
                match self.gateway.send_batch(&message, &targets).await {
                    Ok(report) => self.settle(notification, &report, target, None).await,
                    Err(err) => {
                        tracing::warn!(
                            notification = %notification.id,
                            error = %err,
                            "delivery to originating device failed"
                        );
                        let failed = self.fail(notification, target, &err).await;
                        failed.merge(self.secondary(notification, &message, &fallback).await)
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        notification: &Notification,
        message: &PushMessage,
        targets: &[String],
        target: DeliveryTarget,
        note: Option<&str>,
    ) -> RouteResult {
        match self.gateway.send_batch(message, targets).await {
            Ok(report) => self.settle(notification, &report, target, note).await,
            Err(err) => {
                tracing::warn!(
                    notification = %notification.id,
                    error = %err,
                    "delivery failed"
                );
                self.fail(notification, target, &err).await
            }
        }
    }

    /// Records a completed batch and queues its rejected addresses.
    async fn settle(
        &self,
        notification: &Notification,
        report: &BatchReport,
        target: DeliveryTarget,
        note: Option<&str>,
    ) -> RouteResult {
        let finished = self
            .reconciler
            .delivered(notification, report, target, note)
            .await;
        RouteResult {
            sent: report.success_count,
            pruned: self.reconciler.prune(notification, report),
            deferred: finished.err(),
        }
    }

    async fn fail(
        &self,
        notification: &Notification,
        target: DeliveryTarget,
        err: &GatewayError,
    ) -> RouteResult {
        RouteResult::finished(
            self.reconciler
                .wholesale_failure(notification, target, err)
                .await,
        )
    }

    /// Best-effort reach after the notification is already recorded as failed.
    async fn secondary(
        &self,
        notification: &Notification,
        message: &PushMessage,
        fallback: &[String],
    ) -> RouteResult {
        if fallback.is_empty() {
            return RouteResult::default();
        }
        match self.gateway.send_batch(message, fallback).await {
            Ok(report) => {
                tracing::info!(
                    notification = %notification.id,
                    delivered = report.success_count,
                    targets = fallback.len(),
                    "fallback delivery to other devices completed"
                );
                RouteResult {
                    sent: report.success_count,
                    pruned: self.reconciler.prune(notification, &report),
                    deferred: None,
                }
            }
            Err(err) => {
                tracing::warn!(
                    notification = %notification.id,
                    error = %err,
                    "fallback delivery to other devices failed"
                );
                RouteResult::default()
            }
        }
    }
}
