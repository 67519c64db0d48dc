use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    Disputed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Disputed => "DISPUTED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }
}

pub fn parse_status(s: &str) -> PaymentStatus {
    match s {
        "PROCESSING" => PaymentStatus::Processing,
        "COMPLETED" => PaymentStatus::Completed,
        "FAILED" => PaymentStatus::Failed,
        "REFUNDED" => PaymentStatus::Refunded,
        "DISPUTED" => PaymentStatus::Disputed,
        "CANCELLED" => PaymentStatus::Cancelled,
        _ => PaymentStatus::Pending,
    }
}

/// Status strings reported by the settlement network on inbound webhooks.
pub fn map_external_status(status: &str) -> PaymentStatus {
    match status.to_lowercase().as_str() {
        "completed" | "success" => PaymentStatus::Completed,
        "failed" | "error" => PaymentStatus::Failed,
        "cancelled" => PaymentStatus::Cancelled,
        "refunded" => PaymentStatus::Refunded,
        "disputed" => PaymentStatus::Disputed,
        _ => PaymentStatus::Pending,
    }
}

pub const MAX_METADATA_EXTRA_ENTRIES: usize = 16;

/// Typed metadata carried on every payment, plus a bounded open map for
/// forward-compatible extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_reputation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_trust: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl PaymentMetadata {
    /// Ingest an open key/value map, keeping at most
    /// `MAX_METADATA_EXTRA_ENTRIES` entries (lexicographic order).
    pub fn with_extra(mut self, extra: BTreeMap<String, String>) -> Self {
        self.extra = extra.into_iter().take(MAX_METADATA_EXTRA_ENTRIES).collect();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub metadata: PaymentMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(merchant_id: &str, amount: f64, currency: &str, metadata: PaymentMetadata) -> Self {
        let now = Utc::now();
        Self {
            payment_id: Uuid::new_v4(),
            merchant_id: merchant_id.to_string(),
            amount,
            currency: currency.to_string(),
            status: PaymentStatus::Pending,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub merchant_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            payment_id: p.payment_id,
            merchant_id: p.merchant_id,
            amount: p.amount,
            currency: p.currency,
            status: p.status,
            failure_reason: p.metadata.failure_reason,
            external_payment_id: p.metadata.external_payment_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_status_mapping() {
        assert_eq!(map_external_status("completed"), PaymentStatus::Completed);
        assert_eq!(map_external_status("SUCCESS"), PaymentStatus::Completed);
        assert_eq!(map_external_status("failed"), PaymentStatus::Failed);
        assert_eq!(map_external_status("error"), PaymentStatus::Failed);
        assert_eq!(map_external_status("cancelled"), PaymentStatus::Cancelled);
        assert_eq!(map_external_status("refunded"), PaymentStatus::Refunded);
        assert_eq!(map_external_status("disputed"), PaymentStatus::Disputed);
        assert_eq!(map_external_status("in_flight"), PaymentStatus::Pending);
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Processing,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
            PaymentStatus::Disputed,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(parse_status(status.as_str()), status);
        }
    }

    #[test]
    fn metadata_extra_is_bounded() {
        let big: BTreeMap<String, String> =
            (0..40).map(|i| (format!("k{i:02}"), "v".to_string())).collect();
        let metadata = PaymentMetadata::default().with_extra(big);
        assert_eq!(metadata.extra.len(), MAX_METADATA_EXTRA_ENTRIES);
    }
}
