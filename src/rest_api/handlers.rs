//! Request handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::broker::{BrokerSnapshot, BrokerStatus, LifecycleState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub state: LifecycleState,
    pub ready: bool,
}

/// 200 while the broker is started, 503 otherwise
pub async fn health(State(status): State<BrokerStatus>) -> impl IntoResponse {
    let state = status.state();
    let ready = state.is_started();
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(HealthResponse { state, ready }))
}

pub async fn metrics() -> impl IntoResponse {
    match crate::metrics::encode() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

pub async fn broker(State(status): State<BrokerStatus>) -> Json<BrokerSnapshot> {
    Json(status.snapshot())
}
