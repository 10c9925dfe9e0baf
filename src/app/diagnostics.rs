use crate::adapters::fcm;
use crate::app::{SecretQuery, authorized};
use crate::error::StoreError;
use crate::state;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::{Value as JsonValue, json};
use std::str::FromStr;

/// Read-only views over the backing store, keyed by the `{view}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DebugView {
    Recipients,
    Notifications,
    Registrations,
    Overview,
    Collections,
    Credentials,
}

impl FromStr for DebugView {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "recipients" => Ok(Self::Recipients),
            "notifications" => Ok(Self::Notifications),
            "registrations" => Ok(Self::Registrations),
            "overview" => Ok(Self::Overview),
            "collections" => Ok(Self::Collections),
            "credentials" => Ok(Self::Credentials),
            other => Err(format!("unknown debug view '{other}'")),
        }
    }
}

type DebugResult = Result<Json<JsonValue>, (StatusCode, Json<JsonValue>)>;

pub(crate) async fn debug_view(
    State(state): State<state::AppState>,
    Path(view): Path<String>,
    Query(query): Query<SecretQuery>,
) -> DebugResult {
    if !authorized(&state.config, query.secret.as_deref()) {
        return Err(debug_error(StatusCode::UNAUTHORIZED, "Unauthorized".to_string()));
    }
    let view = DebugView::from_str(&view).map_err(|err| debug_error(StatusCode::NOT_FOUND, err))?;
    render(&state, view).await.map(Json).map_err(|err| {
        tracing::error!(?view, error = %err, "debug view failed");
        debug_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    })
}

async fn render(state: &state::AppState, view: DebugView) -> Result<JsonValue, StoreError> {
    let store = state.diagnostics.as_ref();
    let body = match view {
        DebugView::Recipients => {
            let recipients = store.recipients().await?;
            json!({ "success": true, "recipients": recipients })
        }
        DebugView::Notifications => {
            let notifications = store.notifications().await?;
            json!({
                "success": true,
                "count": notifications.len(),
                "notifications": notifications,
            })
        }
        DebugView::Registrations => {
            let registrations = store.registrations().await?;
            json!({
                "success": true,
                "count": registrations.len(),
                "registrations": registrations,
            })
        }
        DebugView::Overview => {
            let collections = store.collections().await?;
            json!({ "success": true, "collections": collections })
        }
        DebugView::Collections => {
            let names: Vec<&str> = store
                .collections()
                .await?
                .into_iter()
                .map(|collection| collection.name)
                .collect();
            json!({ "success": true, "collections": names })
        }
        DebugView::Credentials => {
            let credentials = &state.config.credentials;
            let present = !credentials.private_key.trim().is_empty();
            json!({
                "success": true,
                "project_id": credentials.project_id,
                "client_email": credentials.client_email,
                "private_key_present": present,
                "private_key_valid": present && fcm::parse_private_key(&credentials.private_key).is_ok(),
            })
        }
    };
    Ok(body)
}

fn debug_error(status: StatusCode, error: String) -> (StatusCode, Json<JsonValue>) {
    (status, Json(json!({ "success": false, "error": error })))
}
