use crate::adapters::TokioTimeProvider;
use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::ports::DiagnosticStore;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub dispatcher: Arc<Dispatcher<TokioTimeProvider>>,
    pub diagnostics: Arc<dyn DiagnosticStore>,
}
