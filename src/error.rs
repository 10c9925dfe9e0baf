use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a whole gateway call, before any per-address outcome exists.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid gateway credentials: {0}")]
    Credentials(String),
    #[error("gateway authentication failed: {0}")]
    Auth(String),
    #[error("gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("no target addresses")]
    EmptyTargets,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("a dispatch cycle is already running")]
    CycleInProgress,
}

/// Startup and serving failures surfaced to `main`.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}
