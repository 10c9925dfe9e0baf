use crate::app::{SecretQuery, authorized};
use crate::error::DispatchError;
use crate::state;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    pub(crate) status: &'static str,
    pub(crate) message: &'static str,
}

pub(crate) async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: "notification dispatcher is running",
    })
}

#[derive(Serialize)]
pub(crate) struct TriggerResponse {
    pub(crate) success: bool,
    pub(crate) sent: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) timestamp: OffsetDateTime,
}

#[derive(Serialize)]
pub(crate) struct TriggerErrorResponse {
    pub(crate) success: bool,
    pub(crate) error: String,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) timestamp: OffsetDateTime,
}

pub(crate) async fn trigger_notifications(
    State(state): State<state::AppState>,
    Query(query): Query<SecretQuery>,
) -> Result<Json<TriggerResponse>, (StatusCode, Json<TriggerErrorResponse>)> {
    if !authorized(&state.config, query.secret.as_deref()) {
        tracing::warn!("trigger rejected: missing or mismatched secret");
        return Err(trigger_error(StatusCode::UNAUTHORIZED, "Unauthorized".to_string()));
    }

    match state.dispatcher.run_cycle().await {
        Ok(report) => Ok(Json(TriggerResponse {
            success: true,
            sent: report.sent,
            timestamp: OffsetDateTime::now_utc(),
        })),
        Err(err) => Err(trigger_error(error_status(&err), err.to_string())),
    }
}

pub(crate) fn error_status(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::CycleInProgress => StatusCode::CONFLICT,
        DispatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn trigger_error(status: StatusCode, error: String) -> (StatusCode, Json<TriggerErrorResponse>) {
    (
        status,
        Json(TriggerErrorResponse {
            success: false,
            error,
            timestamp: OffsetDateTime::now_utc(),
        }),
    )
}
