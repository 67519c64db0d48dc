use crate::domain::payment::Payment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One fraud evaluation outcome. Immutable once written; the per-merchant
/// history of these rows feeds the velocity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub score: f64,
    pub factors: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

impl RiskScore {
    pub fn new(payment: &Payment, score: f64, factors: BTreeMap<String, f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id: payment.payment_id,
            merchant_id: payment.merchant_id.clone(),
            score,
            factors,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudAlertType {
    SuspiciousAmount,
    MultipleFailedAttempts,
    UnusualLocation,
    VelocityCheck,
}

impl FraudAlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudAlertType::SuspiciousAmount => "suspicious_amount",
            FraudAlertType::MultipleFailedAttempts => "multiple_failed_attempts",
            FraudAlertType::UnusualLocation => "unusual_location",
            FraudAlertType::VelocityCheck => "velocity_check",
        }
    }
}

/// Append-only alert raised by the rule engine; the merchant-history factor
/// reads unresolved alerts over a rolling 24-hour window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAlert {
    pub id: Uuid,
    pub alert_type: FraudAlertType,
    pub payment_id: Uuid,
    pub merchant_id: String,
    pub description: String,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FraudAlert {
    pub fn new(payment: &Payment, alert_type: FraudAlertType, description: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            payment_id: payment.payment_id,
            merchant_id: payment.merchant_id.clone(),
            description: description.to_string(),
            resolved: false,
            resolved_by: None,
            resolution: None,
            created_at: Utc::now(),
        }
    }
}

/// Verdict handed to the payment state machine. Rejection is a value, not an
/// error: the caller branches on `approved`.
#[derive(Debug, Clone)]
pub struct RiskVerdict {
    pub approved: bool,
    pub score: f64,
    pub reasons: Vec<String>,
}
