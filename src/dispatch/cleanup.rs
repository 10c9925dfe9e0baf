use crate::ports::AddressRegistry;

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum CleanupJob {
    Remove {
        recipient_id: String,
        address: String,
    },
    Flush(oneshot::Sender<()>),
}

/// Post-commit queue of address deletions. Enqueueing never waits for the
/// registry, and deletion failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<CleanupJob>,
}

impl CleanupQueue {
    /// Starts the worker. It exits once every queue handle is dropped.
    pub fn spawn(registry: Arc<dyn AddressRegistry>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(registry, rx));
        (Self { tx }, handle)
    }

    pub fn enqueue(&self, recipient_id: &str, address: &str) {
        let job = CleanupJob::Remove {
            recipient_id: recipient_id.to_string(),
            address: address.to_string(),
        };
        if self.tx.send(job).is_err() {
            tracing::warn!(
                recipient = recipient_id,
                address,
                "address cleanup worker stopped; deletion dropped"
            );
        }
    }

    /// Waits until every deletion enqueued before this call has been attempted.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(CleanupJob::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

async fn run_worker(
    registry: Arc<dyn AddressRegistry>,
    mut rx: mpsc::UnboundedReceiver<CleanupJob>,
) {
    while let Some(job) = rx.recv().await {
        match job {
            CleanupJob::Remove {
                recipient_id,
                address,
            } => match registry.remove(&recipient_id, &address).await {
                Ok(true) => {
                    tracing::info!(recipient = %recipient_id, %address, "removed invalid address")
                }
                Ok(false) => {
                    tracing::debug!(recipient = %recipient_id, %address, "address already removed")
                }
                Err(err) => tracing::warn!(
                    recipient = %recipient_id,
                    %address,
                    error = %err,
                    "failed to remove invalid address"
                ),
            },
            CleanupJob::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::dispatch::testing::{FailingRegistry, registration};

    #[tokio::test]
    async fn flush__should_wait_for_enqueued_deletions() {
        // Given
        let store = MemoryStore::default();
        store.insert_registration(registration("r1", "A1", Some("x")));
        store.insert_registration(registration("r1", "A2", Some("y")));
        let (queue, _worker) = CleanupQueue::spawn(Arc::new(store.clone()));

        // When
        queue.enqueue("r1", "A1");
        queue.flush().await;

        // Then
        let remaining = store.addresses_now("r1");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].address, "A2");
    }

    #[tokio::test]
    async fn worker__should_swallow_deletion_errors() {
        // Given
        let store = MemoryStore::default();
        store.insert_registration(registration("r1", "A1", None));
        store.insert_registration(registration("r2", "B1", None));
        let registry = FailingRegistry::new(store.clone()).fail_removals();
        let (queue, worker) = CleanupQueue::spawn(Arc::new(registry));

        // When
        queue.enqueue("r1", "A1");
        queue.enqueue("r2", "B1");
        queue.flush().await;
        drop(queue);

        // Then
        worker.await.expect("worker exits cleanly");
        assert_eq!(store.snapshot().registrations.len(), 2);
    }
}
