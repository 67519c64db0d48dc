use crate::domain::payment::Payment;
use chrono::Timelike;

#[derive(Debug, Clone)]
pub struct PaymentFeatures {
    pub amount: f64,
    pub hour_of_day: f64,
    pub attempt_count: f64,
    pub ip_reputation: f64,
    pub device_trust: f64,
}

/// Pluggable fraud classifier: probability of fraud in [0,1].
pub trait FraudModel: Send + Sync {
    fn predict(&self, features: &PaymentFeatures) -> f64;
}

/// Explicit cold-start model: a fixed baseline probability until a trained
/// classifier is plugged in behind the trait.
pub struct ColdStartModel {
    pub baseline: f64,
}

impl Default for ColdStartModel {
    fn default() -> Self {
        Self { baseline: 0.1 }
    }
}

impl FraudModel for ColdStartModel {
    fn predict(&self, _features: &PaymentFeatures) -> f64 {
        self.baseline
    }
}

pub fn extract_features(payment: &Payment, device_trust: f64) -> PaymentFeatures {
    PaymentFeatures {
        amount: payment.amount,
        hour_of_day: f64::from(payment.created_at.hour()),
        attempt_count: f64::from(payment.metadata.attempt_count.unwrap_or(0)),
        ip_reputation: payment.metadata.ip_reputation.unwrap_or(0.0),
        device_trust,
    }
}
