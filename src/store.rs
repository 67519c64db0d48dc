use crate::domain::payment::{Payment, PaymentMetadata, PaymentStatus};
use crate::domain::risk::{FraudAlert, RiskScore};
use crate::domain::webhook::{WebhookDelivery, WebhookEndpoint};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Persistence seams consumed by the pipeline services. The Postgres repos
/// under `repo/` implement these; tests swap in in-memory fakes.

#[async_trait::async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: &Payment) -> Result<()>;

    async fn get(&self, payment_id: Uuid) -> Result<Option<Payment>>;

    /// Compare-and-swap claim: PENDING -> PROCESSING. Returns false when the
    /// payment was already claimed (or is past PENDING), in which case the
    /// caller must not process it again.
    async fn claim_pending(&self, payment_id: Uuid) -> Result<bool>;

    /// Persist the outcome of a processing step: status plus metadata.
    async fn save_outcome(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        metadata: &PaymentMetadata,
    ) -> Result<()>;

    /// Status-only transition, used by inbound webhook handling.
    async fn update_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<()>;
}

#[async_trait::async_trait]
pub trait RiskScoreStore: Send + Sync {
    async fn insert(&self, score: &RiskScore) -> Result<()>;

    /// Risk-score rows recorded for the merchant inside the trailing window.
    async fn count_recent_for_merchant(&self, merchant_id: &str, window: Duration) -> Result<i64>;
}

#[async_trait::async_trait]
pub trait FraudAlertStore: Send + Sync {
    async fn insert(&self, alert: &FraudAlert) -> Result<()>;

    /// Unresolved alerts for the merchant inside the trailing window.
    async fn count_unresolved_for_merchant(
        &self,
        merchant_id: &str,
        window: Duration,
    ) -> Result<i64>;

    async fn resolve(&self, alert_id: Uuid, resolved_by: &str, resolution: &str) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait WebhookEndpointStore: Send + Sync {
    async fn insert(&self, endpoint: &WebhookEndpoint) -> Result<()>;

    async fn list_active(&self, merchant_id: &str) -> Result<Vec<WebhookEndpoint>>;

    async fn get(&self, merchant_id: &str, endpoint_id: Uuid) -> Result<Option<WebhookEndpoint>>;

    /// Soft delete. Returns false when no such endpoint exists.
    async fn deactivate(&self, merchant_id: &str, endpoint_id: Uuid) -> Result<bool>;
}

/// A delivery locked for an attempt, joined with the endpoint it targets.
#[derive(Debug, Clone)]
pub struct DueDelivery {
    pub delivery: WebhookDelivery,
    pub endpoint: WebhookEndpoint,
}

#[async_trait::async_trait]
pub trait WebhookDeliveryStore: Send + Sync {
    async fn enqueue(&self, delivery: &WebhookDelivery) -> Result<()>;

    /// Lock up to `batch_size` deliveries that are due for an attempt. Locked
    /// rows are not returned to concurrent workers.
    async fn lock_due(&self, batch_size: i64) -> Result<Vec<DueDelivery>>;

    /// Record the result of one attempt. `next_attempt_at = None` makes the
    /// delivery terminal (either delivered or permanently failed).
    async fn record_attempt(
        &self,
        delivery_id: Uuid,
        attempts: i32,
        status_code: Option<i32>,
        success: bool,
        response: Option<String>,
        error: Option<String>,
        next_attempt_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    async fn list_recent_for_merchant(
        &self,
        merchant_id: &str,
        limit: i64,
    ) -> Result<Vec<WebhookDelivery>>;
}
