use crate::error::GatewayError;
use crate::types::delivery::{BatchReport, PushMessage};

use futures::future::BoxFuture;

pub trait PushGateway: Send + Sync + 'static {
    /// Sends `message` to every target. `Ok` carries one outcome per target in
    /// target order; `Err` means nothing was attempted or the whole call failed.
    fn send_batch<'a>(
        &'a self,
        message: &'a PushMessage,
        targets: &'a [String],
    ) -> BoxFuture<'a, Result<BatchReport, GatewayError>>;
}
