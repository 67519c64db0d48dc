use crate::domain::context::RequestContext;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::fraud::evaluator::RiskEvaluator;
use crate::gateways::{GatewayError, SettlementGateway};
use crate::metrics::MetricsSink;
use crate::notify::NotificationSink;
use crate::service::webhook_dispatcher::WebhookDispatcher;
use crate::store::PaymentStore;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("payment {0} not found")]
    NotFound(Uuid),
    #[error("payment {payment_id} is not claimable from status {status}")]
    NotClaimable { payment_id: Uuid, status: &'static str },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Orchestrates the payment pipeline: claim -> evaluate risk -> submit to
/// the settlement network -> persist -> notify subscribers.
#[derive(Clone)]
pub struct PaymentProcessor {
    pub payments: Arc<dyn PaymentStore>,
    pub evaluator: RiskEvaluator,
    pub gateway: Arc<dyn SettlementGateway>,
    pub dispatcher: WebhookDispatcher,
    pub metrics: Arc<dyn MetricsSink>,
    pub notifications: Arc<dyn NotificationSink>,
}

impl PaymentProcessor {
    /// Fraud rejection resolves to `Ok` with a FAILED payment; only gateway
    /// and storage failures are errors to the caller. Processing the same
    /// payment twice loses the claim race and returns `NotClaimable`.
    pub async fn process(
        &self,
        payment_id: Uuid,
        ctx: &RequestContext,
    ) -> Result<Payment, ProcessError> {
        let start = Instant::now();
        let mut payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or(ProcessError::NotFound(payment_id))?;

        if !self.payments.claim_pending(payment_id).await? {
            return Err(ProcessError::NotClaimable {
                payment_id,
                status: payment.status.as_str(),
            });
        }
        payment.status = PaymentStatus::Processing;

        let verdict = self.evaluator.evaluate(&payment, ctx).await;
        payment.metadata.risk_score = Some(verdict.score);

        if !verdict.approved {
            let reason = verdict
                .reasons
                .first()
                .cloned()
                .unwrap_or_else(|| "High risk score detected".to_string());
            payment.status = PaymentStatus::Failed;
            payment.metadata.failure_reason = Some(reason);
            self.payments
                .save_outcome(payment_id, payment.status, &payment.metadata)
                .await?;

            self.notify_update(&payment).await;
            self.alert_failure(&payment).await;
            self.record_outcome("rejected", start).await;
            return Ok(payment);
        }

        let memo = format!("Payment to merchant {}", payment.merchant_id);
        let submission_metadata = serde_json::json!({
            "payment_id": payment.payment_id,
            "merchant_id": payment.merchant_id,
            "extra": payment.metadata.extra,
        });

        match self
            .gateway
            .create_payment(payment.amount, &memo, &submission_metadata)
            .await
        {
            Ok(external) => {
                payment.metadata.external_payment_id = Some(external.id);
                payment.status = PaymentStatus::Processing;
                self.payments
                    .save_outcome(payment_id, payment.status, &payment.metadata)
                    .await?;

                self.notify_update(&payment).await;
                self.record_outcome("submitted", start).await;
                Ok(payment)
            }
            Err(err) => {
                tracing::error!(payment_id = %payment_id, "settlement submission failed: {err}");
                payment.status = PaymentStatus::Failed;
                payment.metadata.failure_reason = Some(err.to_string());
                self.payments
                    .save_outcome(payment_id, payment.status, &payment.metadata)
                    .await?;

                self.notify_update(&payment).await;
                self.alert_failure(&payment).await;
                self.record_outcome("gateway_error", start).await;
                Err(ProcessError::Gateway(err))
            }
        }
    }

    /// Fire-and-forget fanout; processing never waits on delivery outcomes.
    async fn notify_update(&self, payment: &Payment) {
        let payload = serde_json::json!({
            "event": "payment.updated",
            "resource_id": payment.payment_id,
            "status": payment.status,
            "data": {
                "amount": payment.amount,
                "currency": payment.currency,
                "metadata": payment.metadata,
            },
        });

        if let Err(err) = self
            .dispatcher
            .notify_all(&payment.merchant_id, "payment.updated", payload)
            .await
        {
            tracing::warn!(payment_id = %payment.payment_id, "webhook fanout failed: {err:#}");
        }
    }

    async fn alert_failure(&self, payment: &Payment) {
        let reason = payment
            .metadata
            .failure_reason
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        self.notifications
            .send_account_notification(
                &payment.merchant_id,
                "Payment failed",
                &format!("Payment {} failed: {}", payment.payment_id, reason),
                serde_json::json!({ "payment_id": payment.payment_id }),
            )
            .await;
    }

    async fn record_outcome(&self, outcome: &str, start: Instant) {
        self.metrics
            .record(
                "payments.processed",
                1.0,
                &[("outcome", outcome.to_string())],
            )
            .await;
        self.metrics
            .record(
                "payments.processing_time",
                start.elapsed().as_millis() as f64,
                &[("outcome", outcome.to_string())],
            )
            .await;
    }
}
