mod cleanup;
mod cycle;
mod due_set;
mod reconcile;
mod registry;
mod routing;
mod ticker;

#[cfg(test)]
pub(crate) mod testing;

pub use cleanup::CleanupQueue;
pub use cycle::{CycleReport, DispatchContext, Dispatcher};
pub use ticker::{TickerHandle, spawn_ticker};
