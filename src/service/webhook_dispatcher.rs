use crate::domain::payment::{map_external_status, PaymentStatus};
use crate::domain::transitions::is_valid_transition;
use crate::domain::webhook::{WebhookDelivery, WebhookEndpoint, WebhookEventPayload};
use crate::metrics::MetricsSink;
use crate::service::webhook_retry;
use crate::signature;
use crate::store::{PaymentStore, WebhookDeliveryStore, WebhookEndpointStore};
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Inbound webhook failures. Signature problems are terminal: rejected
/// immediately, no retry, no state mutation.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing webhook signature")]
    MissingSignature,
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("malformed webhook payload: {0}")]
    Malformed(String),
    #[error("unknown resource {0}")]
    UnknownResource(Uuid),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Result of a single outbound POST, recorded on the delivery row.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub status_code: Option<i32>,
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    pub endpoints: Arc<dyn WebhookEndpointStore>,
    pub deliveries: Arc<dyn WebhookDeliveryStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub metrics: Arc<dyn MetricsSink>,
    pub client: reqwest::Client,
    pub timeout_ms: u64,
    pub max_retries: i32,
    /// Global secret for inbound settlement-network webhooks.
    pub inbound_secret: String,
}

impl WebhookDispatcher {
    /// Enqueue one delivery per active, subscribed endpoint. Deliveries are
    /// independent jobs: one endpoint failing to enqueue never blocks the
    /// rest, and nothing here waits on delivery outcomes.
    pub async fn notify_all(
        &self,
        merchant_id: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let endpoints = self.endpoints.list_active(merchant_id).await?;
        for endpoint in endpoints.iter().filter(|e| e.subscribes_to(event)) {
            let delivery = WebhookDelivery::pending(endpoint.id, event, payload.clone());
            if let Err(err) = self.deliveries.enqueue(&delivery).await {
                tracing::warn!(endpoint_id = %endpoint.id, event, "failed to enqueue webhook: {err:#}");
            }
        }

        Ok(())
    }

    /// One signed POST to the endpoint. Success is a 2xx response.
    pub async fn attempt(
        &self,
        endpoint: &WebhookEndpoint,
        delivery: &WebhookDelivery,
    ) -> AttemptOutcome {
        let body = delivery.payload.to_string();
        let sig = signature::sign(endpoint.secret.as_bytes(), body.as_bytes());

        let resp = self
            .client
            .post(&endpoint.url)
            .header("Content-Type", "application/json")
            .header("X-Webhook-Signature", sig)
            .header("X-Event-Type", &delivery.event)
            .body(body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await;

        match resp {
            Ok(r) => {
                let status = r.status().as_u16() as i32;
                let success = r.status().is_success();
                let text = r.text().await.unwrap_or_default();
                AttemptOutcome {
                    status_code: Some(status),
                    success,
                    response: Some(text.chars().take(500).collect()),
                    error: None,
                }
            }
            Err(e) => AttemptOutcome {
                status_code: None,
                success: false,
                response: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Immediate one-shot delivery of a `test` event to a single endpoint;
    /// a failed test is retried by the worker like any other delivery.
    pub async fn send_test(
        &self,
        merchant_id: &str,
        endpoint_id: Uuid,
    ) -> Result<Option<WebhookDelivery>> {
        let Some(endpoint) = self.endpoints.get(merchant_id, endpoint_id).await? else {
            return Ok(None);
        };

        let payload = serde_json::json!({
            "event": "test",
            "resource_id": endpoint.id,
            "status": "test",
            "data": { "timestamp": chrono::Utc::now().to_rfc3339() },
        });
        let mut delivery = WebhookDelivery::pending(endpoint.id, "test", payload);
        self.deliveries.enqueue(&delivery).await?;

        let outcome = self.attempt(&endpoint, &delivery).await;
        delivery.attempts = 1;
        delivery.status_code = outcome.status_code;
        delivery.success = outcome.success;
        delivery.response = outcome.response.clone();
        delivery.error = outcome.error.clone();
        delivery.next_attempt_at = webhook_retry::plan_next_attempt(
            delivery.attempts,
            outcome.success,
            self.max_retries,
            chrono::Utc::now(),
        );
        self.deliveries
            .record_attempt(
                delivery.id,
                delivery.attempts,
                outcome.status_code,
                outcome.success,
                outcome.response,
                outcome.error,
                delivery.next_attempt_at,
            )
            .await?;

        Ok(Some(delivery))
    }

    /// Validate and route an inbound status update from the settlement
    /// network. The signature is checked over the raw body against the
    /// global secret before anything is parsed or mutated.
    pub async fn handle_inbound(
        &self,
        signature_header: Option<&str>,
        body: &[u8],
    ) -> Result<(), WebhookError> {
        let provided = signature_header.ok_or(WebhookError::MissingSignature)?;
        if !signature::verify(self.inbound_secret.as_bytes(), body, provided) {
            return Err(WebhookError::InvalidSignature);
        }

        let payload: WebhookEventPayload =
            serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;

        let mapped = map_external_status(&payload.status);
        let (payment_id, target) = if payload.event.starts_with("refund.") {
            if mapped != PaymentStatus::Completed {
                tracing::info!(event = %payload.event, status = %payload.status, "ignoring non-terminal refund update");
                return Ok(());
            }
            (parent_payment_id(&payload), PaymentStatus::Refunded)
        } else if payload.event.starts_with("dispute.") {
            (parent_payment_id(&payload), PaymentStatus::Disputed)
        } else {
            (payload.resource_id, mapped)
        };

        let payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or(WebhookError::UnknownResource(payment_id))?;

        if !is_valid_transition(payment.status, target) {
            tracing::warn!(
                payment_id = %payment_id,
                from = payment.status.as_str(),
                to = target.as_str(),
                "skipping illegal status transition from inbound webhook"
            );
            return Ok(());
        }

        self.payments.update_status(payment_id, target).await?;
        self.metrics
            .record(
                "webhooks.inbound_applied",
                1.0,
                &[("event", payload.event.clone()), ("status", target.as_str().to_string())],
            )
            .await;

        Ok(())
    }
}

/// Refund/dispute events reference their own resource; the parent payment
/// rides in `data.payment_id` when the network provides it.
fn parent_payment_id(payload: &WebhookEventPayload) -> Uuid {
    payload
        .data
        .as_ref()
        .and_then(|d| d.get("payment_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or(payload.resource_id)
}
