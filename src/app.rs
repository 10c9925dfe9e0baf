use crate::config::AppConfig;
use crate::secret;
use crate::state;

use axum::Router;
use axum::routing::get;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

mod diagnostics;
mod trigger;

pub fn app(state: state::AppState) -> Router {
    Router::new()
        .route("/", get(trigger::root))
        .route("/health", get(health))
        .route("/trigger-notifications", get(trigger::trigger_notifications))
        .route("/debug/{view}", get(diagnostics::debug_view))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SecretQuery {
    pub(crate) secret: Option<String>,
}

/// Open when no trigger secret is configured.
pub(crate) fn authorized(config: &AppConfig, provided: Option<&str>) -> bool {
    match config.trigger_secret.as_deref() {
        None => true,
        Some(expected) => provided.is_some_and(|provided| secret::secret_matches(expected, provided)),
    }
}
