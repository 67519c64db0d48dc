use crate::domain::webhook::{WebhookDelivery, WebhookEndpoint};
use crate::http::handlers::payments::{err, internal};
use crate::service::webhook_dispatcher::WebhookError;
use crate::signature;
use crate::store::{WebhookDeliveryStore, WebhookEndpointStore};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Inbound status update from the settlement network. The raw body is
/// verified against the global secret before any parsing.
pub async fn inbound_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let sig = headers.get("x-webhook-signature").and_then(|h| h.to_str().ok());

    match state.webhook_dispatcher.handle_inbound(sig, &body).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(e @ (WebhookError::MissingSignature | WebhookError::InvalidSignature)) => (
            StatusCode::UNAUTHORIZED,
            Json(err("INVALID_SIGNATURE", &e.to_string())),
        )
            .into_response(),
        Err(e @ WebhookError::Malformed(_)) => {
            (StatusCode::BAD_REQUEST, Json(err("MALFORMED_PAYLOAD", &e.to_string()))).into_response()
        }
        Err(e @ WebhookError::UnknownResource(_)) => {
            (StatusCode::NOT_FOUND, Json(err("UNKNOWN_RESOURCE", &e.to_string()))).into_response()
        }
        Err(WebhookError::Store(e)) => internal(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEndpointRequest {
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EndpointResponse {
    pub id: Uuid,
    pub merchant_id: String,
    pub url: String,
    pub is_active: bool,
    pub events: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&WebhookEndpoint> for EndpointResponse {
    fn from(e: &WebhookEndpoint) -> Self {
        Self {
            id: e.id,
            merchant_id: e.merchant_id.clone(),
            url: e.url.clone(),
            is_active: e.is_active,
            events: e.events.clone(),
            created_at: e.created_at,
        }
    }
}

/// The signing secret is generated server-side and returned only here.
#[derive(Debug, Serialize)]
pub struct CreatedEndpointResponse {
    #[serde(flatten)]
    pub endpoint: EndpointResponse,
    pub secret: String,
}

pub async fn create_endpoint(
    State(state): State<AppState>,
    Path(merchant_id): Path<String>,
    Json(req): Json<CreateEndpointRequest>,
) -> impl IntoResponse {
    if !req.url.starts_with("http://") && !req.url.starts_with("https://") {
        return (StatusCode::BAD_REQUEST, Json(err("INVALID_URL", "url must be http(s)")))
            .into_response();
    }

    let now = Utc::now();
    let endpoint = WebhookEndpoint {
        id: Uuid::new_v4(),
        merchant_id,
        url: req.url,
        secret: signature::generate_endpoint_secret(),
        is_active: true,
        events: req.events,
        created_at: now,
        updated_at: now,
    };

    match state.webhook_endpoints_repo.insert(&endpoint).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(CreatedEndpointResponse {
                endpoint: EndpointResponse::from(&endpoint),
                secret: endpoint.secret.clone(),
            }),
        )
            .into_response(),
        Err(e) => internal(e).into_response(),
    }
}

pub async fn list_endpoints(
    State(state): State<AppState>,
    Path(merchant_id): Path<String>,
) -> impl IntoResponse {
    match state.webhook_endpoints_repo.list_active(&merchant_id).await {
        Ok(endpoints) => {
            let redacted: Vec<EndpointResponse> =
                endpoints.iter().map(EndpointResponse::from).collect();
            (StatusCode::OK, Json(redacted)).into_response()
        }
        Err(e) => internal(e).into_response(),
    }
}

pub async fn delete_endpoint(
    State(state): State<AppState>,
    Path((merchant_id, endpoint_id)): Path<(String, Uuid)>,
) -> impl IntoResponse {
    match state.webhook_endpoints_repo.deactivate(&merchant_id, endpoint_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => {
            (StatusCode::NOT_FOUND, Json(err("NOT_FOUND", "webhook endpoint not found")))
                .into_response()
        }
        Err(e) => internal(e).into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub event: String,
    pub attempts: i32,
    pub status_code: Option<i32>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&WebhookDelivery> for DeliveryResponse {
    fn from(d: &WebhookDelivery) -> Self {
        Self {
            id: d.id,
            endpoint_id: d.endpoint_id,
            event: d.event.clone(),
            attempts: d.attempts,
            status_code: d.status_code,
            success: d.success,
            created_at: d.created_at,
        }
    }
}

pub async fn list_deliveries(
    State(state): State<AppState>,
    Path(merchant_id): Path<String>,
) -> impl IntoResponse {
    match state.webhook_deliveries_repo.list_recent_for_merchant(&merchant_id, 100).await {
        Ok(deliveries) => {
            let out: Vec<DeliveryResponse> = deliveries.iter().map(DeliveryResponse::from).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => internal(e).into_response(),
    }
}

pub async fn send_test_webhook(
    State(state): State<AppState>,
    Path((merchant_id, endpoint_id)): Path<(String, Uuid)>,
) -> impl IntoResponse {
    match state.webhook_dispatcher.send_test(&merchant_id, endpoint_id).await {
        Ok(Some(delivery)) => {
            (StatusCode::OK, Json(DeliveryResponse::from(&delivery))).into_response()
        }
        Ok(None) => {
            (StatusCode::NOT_FOUND, Json(err("NOT_FOUND", "webhook endpoint not found")))
                .into_response()
        }
        Err(e) => internal(e).into_response(),
    }
}
