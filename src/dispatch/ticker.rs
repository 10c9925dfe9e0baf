use crate::dispatch::cycle::Dispatcher;
use crate::error::DispatchError;
use crate::ports::TimeProvider;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Periodic in-process trigger. Dropping the handle leaves the task running.
pub struct TickerHandle {
    pub interval: Duration,
    handle: JoinHandle<()>,
}

impl TickerHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

pub fn spawn_ticker<T: TimeProvider>(
    dispatcher: Arc<Dispatcher<T>>,
    interval: Duration,
) -> TickerHandle {
    let handle = tokio::spawn(run_ticker(dispatcher, interval));
    TickerHandle { interval, handle }
}

async fn run_ticker<T: TimeProvider>(dispatcher: Arc<Dispatcher<T>>, interval: Duration) {
    loop {
        dispatcher.time().sleep(interval).await;
        match dispatcher.run_cycle().await {
            Ok(report) => tracing::debug!(sent = report.sent, "scheduled cycle completed"),
            Err(DispatchError::CycleInProgress) => {
                tracing::debug!("previous cycle still running; tick skipped")
            }
            Err(err) => tracing::error!(error = %err, "scheduled cycle failed"),
        }
    }
}
