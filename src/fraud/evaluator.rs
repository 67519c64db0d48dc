use crate::domain::context::RequestContext;
use crate::domain::payment::Payment;
use crate::domain::risk::{FraudAlert, FraudAlertType, RiskScore, RiskVerdict};
use crate::fraud::fingerprint::{self, DeviceTrustProvider};
use crate::fraud::ip::IpIntelligence;
use crate::fraud::ml::{self, FraudModel};
use crate::fraud::rules;
use crate::metrics::MetricsSink;
use crate::notify::NotificationSink;
use crate::store::{FraudAlertStore, RiskScoreStore};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Approval threshold on the blended score.
pub const APPROVE_BELOW: f64 = 0.7;

pub fn clamp01(v: f64) -> f64 {
    if v < 0.0 {
        0.0
    } else if v > 1.0 {
        1.0
    } else {
        v
    }
}

/// Weighted blend of the four signals. Rule sums can exceed 1.0, so every
/// input is clamped before weighting.
pub fn final_score(rule_score: f64, ml_score: f64, device_trust: f64, ip_risk: f64) -> f64 {
    clamp01(
        0.3 * clamp01(rule_score)
            + 0.3 * clamp01(ml_score)
            + 0.2 * (1.0 - clamp01(device_trust))
            + 0.2 * clamp01(ip_risk),
    )
}

struct RuleOutcome {
    score: f64,
    amount: f64,
    velocity: f64,
}

#[derive(Clone)]
pub struct RiskEvaluator {
    pub risk_scores: Arc<dyn RiskScoreStore>,
    pub fraud_alerts: Arc<dyn FraudAlertStore>,
    pub device_trust: Arc<dyn DeviceTrustProvider>,
    pub ip_intelligence: Arc<dyn IpIntelligence>,
    pub model: Arc<dyn FraudModel>,
    pub metrics: Arc<dyn MetricsSink>,
    pub notifications: Arc<dyn NotificationSink>,
}

impl RiskEvaluator {
    /// Never fails: any internal error is converted into a conservative
    /// rejection at score 1.0.
    pub async fn evaluate(&self, payment: &Payment, ctx: &RequestContext) -> RiskVerdict {
        let start = Instant::now();
        match self.evaluate_inner(payment, ctx).await {
            Ok(verdict) => {
                self.metrics
                    .record(
                        "fraud.evaluation_time",
                        start.elapsed().as_millis() as f64,
                        &[("merchant_id", payment.merchant_id.clone())],
                    )
                    .await;
                self.metrics
                    .record(
                        "fraud.final_score",
                        verdict.score,
                        &[
                            ("merchant_id", payment.merchant_id.clone()),
                            ("approved", verdict.approved.to_string()),
                        ],
                    )
                    .await;
                verdict
            }
            Err(err) => {
                tracing::error!(payment_id = %payment.payment_id, "fraud evaluation failed: {err:#}");
                self.metrics.record("fraud.evaluation_error", 1.0, &[]).await;
                RiskVerdict {
                    approved: false,
                    score: 1.0,
                    reasons: vec!["System error during fraud evaluation".to_string()],
                }
            }
        }
    }

    async fn evaluate_inner(&self, payment: &Payment, ctx: &RequestContext) -> Result<RiskVerdict> {
        let mut reasons = Vec::new();

        let fingerprint = fingerprint::generate(ctx);
        let device_trust = self.device_trust.trust_score(&fingerprint).await?;

        let ip = self.ip_intelligence.analyze(&ctx.ip).await?;
        if ip.risk > 0.7 {
            reasons.push("High-risk IP address".to_string());
        }

        if self.ip_intelligence.is_known_bad(&ctx.ip).await? {
            reasons.push("Known malicious IP address".to_string());
            let record =
                RiskScore::new(payment, 1.0, BTreeMap::from([("ip".to_string(), 1.0)]));
            self.risk_scores.insert(&record).await?;
            return Ok(RiskVerdict { approved: false, score: 1.0, reasons });
        }

        let rule = self.evaluate_rules(payment).await?;
        if rule.score > 0.7 {
            reasons.push("High risk score from rules engine".to_string());
        }

        let features = ml::extract_features(payment, device_trust);
        let ml_score = self.model.predict(&features);
        if ml_score > 0.8 {
            reasons.push("High risk prediction from ML model".to_string());
        }

        let score = final_score(rule.score, ml_score, device_trust, ip.risk);
        // Alerts fire on factor thresholds regardless of the final verdict.
        if rule.amount >= 0.8 {
            self.raise_alert(
                payment,
                FraudAlertType::SuspiciousAmount,
                "Unusually high transaction amount detected",
            )
            .await?;
        }
        if rule.velocity >= 0.6 {
            self.raise_alert(
                payment,
                FraudAlertType::VelocityCheck,
                "High transaction velocity detected",
            )
            .await?;
        }

        Ok(RiskVerdict { approved: score < APPROVE_BELOW, score, reasons })
    }

    async fn evaluate_rules(&self, payment: &Payment) -> Result<RuleOutcome> {
        let mut factors = BTreeMap::new();

        let amount = rules::amount_factor(payment.amount);
        if amount > 0.0 {
            factors.insert("amount".to_string(), amount);
        }

        let recent = self
            .risk_scores
            .count_recent_for_merchant(&payment.merchant_id, chrono::Duration::minutes(5))
            .await?;
        let velocity = rules::velocity_factor(recent);
        if velocity > 0.0 {
            factors.insert("velocity".to_string(), velocity);
        }

        let open_alerts = self
            .fraud_alerts
            .count_unresolved_for_merchant(&payment.merchant_id, chrono::Duration::hours(24))
            .await?;
        let merchant = rules::merchant_history_factor(open_alerts);
        if merchant > 0.0 {
            factors.insert("merchant".to_string(), merchant);
        }

        let score = clamp01(amount + velocity + merchant);
        let record = RiskScore::new(payment, score, factors.clone());
        self.risk_scores.insert(&record).await?;

        self.metrics
            .record(
                "fraud.risk_score",
                score,
                &[
                    ("merchant_id", payment.merchant_id.clone()),
                    (
                        "factors",
                        factors.keys().cloned().collect::<Vec<_>>().join(","),
                    ),
                ],
            )
            .await;
        if score >= 0.7 {
            self.metrics
                .record(
                    "fraud.high_risk_payment",
                    1.0,
                    &[("merchant_id", payment.merchant_id.clone())],
                )
                .await;
        }

        Ok(RuleOutcome { score, amount, velocity })
    }

    async fn raise_alert(
        &self,
        payment: &Payment,
        alert_type: FraudAlertType,
        description: &str,
    ) -> Result<()> {
        let alert = FraudAlert::new(payment, alert_type, description);
        self.fraud_alerts.insert(&alert).await?;

        self.metrics
            .record(
                "fraud.alert_created",
                1.0,
                &[
                    ("type", alert_type.as_str().to_string()),
                    ("merchant_id", payment.merchant_id.clone()),
                ],
            )
            .await;
        self.notifications
            .send_account_notification(
                &payment.merchant_id,
                "Fraud alert",
                description,
                serde_json::json!({
                    "alert_id": alert.id,
                    "payment_id": payment.payment_id,
                    "type": alert_type.as_str(),
                }),
            )
            .await;

        Ok(())
    }
}
