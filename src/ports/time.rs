use std::time::Duration;

use time::OffsetDateTime;

/// Wall clock of the dispatcher.
///
/// `now` anchors each cycle's due window and stamps claims and delivery
/// records, so tests pin it to a fixed instant.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    /// Current UTC instant.
    fn now(&self) -> OffsetDateTime;
    /// Waits between ticker cycles. Nothing else in the dispatcher sleeps.
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;
}
