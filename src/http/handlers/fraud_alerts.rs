use crate::http::handlers::payments::{err, internal};
use crate::store::FraudAlertStore;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ResolveAlertRequest {
    pub resolved_by: String,
    pub resolution: String,
}

/// Admin operation: close an open fraud alert. Resolved alerts stop counting
/// toward the merchant-history risk factor.
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
    Json(req): Json<ResolveAlertRequest>,
) -> impl IntoResponse {
    match state
        .fraud_alerts_repo
        .resolve(alert_id, &req.resolved_by, &req.resolution)
        .await
    {
        Ok(true) => (StatusCode::OK, Json(json!({ "resolved": true }))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(err("NOT_FOUND", "no unresolved alert with that id")),
        )
            .into_response(),
        Err(e) => internal(e).into_response(),
    }
}
