pub mod adapters;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ports;
pub mod secret;
pub mod state;
pub mod types;

use crate::adapters::{FcmGateway, FileStore, TokioTimeProvider};
use crate::config::AppConfig;
use crate::dispatch::{CleanupQueue, DispatchContext, Dispatcher};
use crate::error::ServeError;
use crate::ports::AddressRegistry;

use std::net::SocketAddr;
use std::sync::Arc;

pub async fn serve(config: AppConfig) -> Result<(), ServeError> {
    let store = FileStore::open(config.data_file.clone()).await?;
    let gateway = FcmGateway::new(&config.credentials)?;

    let registry: Arc<dyn AddressRegistry> = Arc::new(store.clone());
    let (cleanup, _cleanup_worker) = CleanupQueue::spawn(Arc::clone(&registry));
    let context = DispatchContext {
        notifications: Arc::new(store.clone()),
        registry,
        gateway: Arc::new(gateway),
    };
    let dispatcher = Arc::new(Dispatcher::new(
        context,
        cleanup,
        TokioTimeProvider,
        config.dispatch.clone(),
    ));

    let _ticker = config.dispatch.interval.map(|interval| {
        tracing::info!(interval_seconds = interval.as_secs(), "starting periodic dispatch");
        dispatch::spawn_ticker(Arc::clone(&dispatcher), interval)
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = state::AppState {
        config,
        dispatcher,
        diagnostics: Arc::new(store.clone()),
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        data_file = %store.path().display(),
        project = %state.config.credentials.project_id,
        "listening"
    );
    axum::serve(listener, app::app(state)).await?;
    Ok(())
}
