//! In-memory collaborators for exercising the pipeline without Postgres or
//! a live settlement network.
#![allow(dead_code)]

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use merchant_gateway::domain::payment::{Payment, PaymentMetadata, PaymentStatus};
use merchant_gateway::domain::risk::{FraudAlert, RiskScore};
use merchant_gateway::domain::webhook::{WebhookDelivery, WebhookEndpoint};
use merchant_gateway::fraud::evaluator::RiskEvaluator;
use merchant_gateway::fraud::fingerprint::FixedDeviceTrust;
use merchant_gateway::fraud::ip::StaticIpIntelligence;
use merchant_gateway::fraud::ml::ColdStartModel;
use merchant_gateway::gateways::mock::MockSettlementGateway;
use merchant_gateway::metrics::MetricsSink;
use merchant_gateway::notify::LogNotificationSink;
use merchant_gateway::service::payment_processor::PaymentProcessor;
use merchant_gateway::service::webhook_dispatcher::WebhookDispatcher;
use merchant_gateway::service::webhook_retry;
use merchant_gateway::store::{
    DueDelivery, FraudAlertStore, PaymentStore, RiskScoreStore, WebhookDeliveryStore,
    WebhookEndpointStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryPaymentStore {
    pub payments: Mutex<HashMap<Uuid, Payment>>,
}

#[async_trait::async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        self.payments.lock().unwrap().insert(payment.payment_id, payment.clone());
        Ok(())
    }

    async fn get(&self, payment_id: Uuid) -> Result<Option<Payment>> {
        Ok(self.payments.lock().unwrap().get(&payment_id).cloned())
    }

    async fn claim_pending(&self, payment_id: Uuid) -> Result<bool> {
        let mut payments = self.payments.lock().unwrap();
        match payments.get_mut(&payment_id) {
            Some(p) if p.status == PaymentStatus::Pending => {
                p.status = PaymentStatus::Processing;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn save_outcome(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        metadata: &PaymentMetadata,
    ) -> Result<()> {
        let mut payments = self.payments.lock().unwrap();
        if let Some(p) = payments.get_mut(&payment_id) {
            p.status = status;
            p.metadata = metadata.clone();
            p.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<()> {
        let mut payments = self.payments.lock().unwrap();
        if let Some(p) = payments.get_mut(&payment_id) {
            p.status = status;
            p.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRiskScoreStore {
    pub scores: Mutex<Vec<RiskScore>>,
    /// Forces inserts to fail, to exercise the fail-closed path.
    pub fail_inserts: bool,
}

#[async_trait::async_trait]
impl RiskScoreStore for MemoryRiskScoreStore {
    async fn insert(&self, score: &RiskScore) -> Result<()> {
        if self.fail_inserts {
            bail!("synthetic risk store failure");
        }
        self.scores.lock().unwrap().push(score.clone());
        Ok(())
    }

    async fn count_recent_for_merchant(&self, merchant_id: &str, window: Duration) -> Result<i64> {
        let since = Utc::now() - window;
        Ok(self
            .scores
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.merchant_id == merchant_id && s.created_at > since)
            .count() as i64)
    }
}

#[derive(Default)]
pub struct MemoryFraudAlertStore {
    pub alerts: Mutex<Vec<FraudAlert>>,
}

#[async_trait::async_trait]
impl FraudAlertStore for MemoryFraudAlertStore {
    async fn insert(&self, alert: &FraudAlert) -> Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    async fn count_unresolved_for_merchant(
        &self,
        merchant_id: &str,
        window: Duration,
    ) -> Result<i64> {
        let since = Utc::now() - window;
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.merchant_id == merchant_id && !a.resolved && a.created_at > since)
            .count() as i64)
    }

    async fn resolve(&self, alert_id: Uuid, resolved_by: &str, resolution: &str) -> Result<bool> {
        let mut alerts = self.alerts.lock().unwrap();
        match alerts.iter_mut().find(|a| a.id == alert_id && !a.resolved) {
            Some(alert) => {
                alert.resolved = true;
                alert.resolved_by = Some(resolved_by.to_string());
                alert.resolution = Some(resolution.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryWebhookEndpointStore {
    pub endpoints: Mutex<Vec<WebhookEndpoint>>,
}

#[async_trait::async_trait]
impl WebhookEndpointStore for MemoryWebhookEndpointStore {
    async fn insert(&self, endpoint: &WebhookEndpoint) -> Result<()> {
        self.endpoints.lock().unwrap().push(endpoint.clone());
        Ok(())
    }

    async fn list_active(&self, merchant_id: &str) -> Result<Vec<WebhookEndpoint>> {
        Ok(self
            .endpoints
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.merchant_id == merchant_id && e.is_active)
            .cloned()
            .collect())
    }

    async fn get(&self, merchant_id: &str, endpoint_id: Uuid) -> Result<Option<WebhookEndpoint>> {
        Ok(self
            .endpoints
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == endpoint_id && e.merchant_id == merchant_id)
            .cloned())
    }

    async fn deactivate(&self, merchant_id: &str, endpoint_id: Uuid) -> Result<bool> {
        let mut endpoints = self.endpoints.lock().unwrap();
        match endpoints.iter_mut().find(|e| e.id == endpoint_id && e.merchant_id == merchant_id) {
            Some(e) => {
                e.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Delivery queue fake. `lock_due` returns every non-terminal delivery
/// without honoring `next_attempt_at`, so retry tests do not sleep through
/// real backoff windows; the schedule arithmetic itself is covered by the
/// `webhook_retry` unit tests.
pub struct MemoryWebhookDeliveryStore {
    pub deliveries: Mutex<Vec<WebhookDelivery>>,
    pub endpoints: Arc<MemoryWebhookEndpointStore>,
}

#[async_trait::async_trait]
impl WebhookDeliveryStore for MemoryWebhookDeliveryStore {
    async fn enqueue(&self, delivery: &WebhookDelivery) -> Result<()> {
        self.deliveries.lock().unwrap().push(delivery.clone());
        Ok(())
    }

    async fn lock_due(&self, batch_size: i64) -> Result<Vec<DueDelivery>> {
        let deliveries = self.deliveries.lock().unwrap();
        let endpoints = self.endpoints.endpoints.lock().unwrap();
        Ok(deliveries
            .iter()
            .filter(|d| !d.success && d.next_attempt_at.is_some())
            .take(batch_size as usize)
            .filter_map(|d| {
                endpoints.iter().find(|e| e.id == d.endpoint_id).map(|e| DueDelivery {
                    delivery: d.clone(),
                    endpoint: e.clone(),
                })
            })
            .collect())
    }

    async fn record_attempt(
        &self,
        delivery_id: Uuid,
        attempts: i32,
        status_code: Option<i32>,
        success: bool,
        response: Option<String>,
        error: Option<String>,
        next_attempt_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut deliveries = self.deliveries.lock().unwrap();
        if let Some(d) = deliveries.iter_mut().find(|d| d.id == delivery_id) {
            d.attempts = attempts;
            d.status_code = status_code;
            d.success = success;
            d.response = response;
            d.error = error;
            d.next_attempt_at = next_attempt_at;
        }
        Ok(())
    }

    async fn list_recent_for_merchant(
        &self,
        merchant_id: &str,
        limit: i64,
    ) -> Result<Vec<WebhookDelivery>> {
        let deliveries = self.deliveries.lock().unwrap();
        let endpoints = self.endpoints.endpoints.lock().unwrap();
        Ok(deliveries
            .iter()
            .filter(|d| {
                endpoints.iter().any(|e| e.id == d.endpoint_id && e.merchant_id == merchant_id)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub points: Mutex<Vec<(String, f64)>>,
}

#[async_trait::async_trait]
impl MetricsSink for RecordingMetrics {
    async fn record(&self, name: &str, value: f64, _tags: &[(&str, String)]) {
        self.points.lock().unwrap().push((name.to_string(), value));
    }
}

impl RecordingMetrics {
    pub fn has(&self, name: &str) -> bool {
        self.points.lock().unwrap().iter().any(|(n, _)| n == name)
    }
}

pub struct Harness {
    pub payments: Arc<MemoryPaymentStore>,
    pub scores: Arc<MemoryRiskScoreStore>,
    pub alerts: Arc<MemoryFraudAlertStore>,
    pub endpoints: Arc<MemoryWebhookEndpointStore>,
    pub deliveries: Arc<MemoryWebhookDeliveryStore>,
    pub metrics: Arc<RecordingMetrics>,
    pub gateway: Arc<MockSettlementGateway>,
    pub processor: PaymentProcessor,
    pub dispatcher: WebhookDispatcher,
}

pub const INBOUND_SECRET: &str = "global-inbound-secret";

pub fn harness(gateway_behavior: &str, known_bad_ips: Vec<String>) -> Harness {
    harness_with_scores(gateway_behavior, known_bad_ips, MemoryRiskScoreStore::default())
}

pub fn harness_with_scores(
    gateway_behavior: &str,
    known_bad_ips: Vec<String>,
    scores: MemoryRiskScoreStore,
) -> Harness {
    let payments = Arc::new(MemoryPaymentStore::default());
    let scores = Arc::new(scores);
    let alerts = Arc::new(MemoryFraudAlertStore::default());
    let endpoints = Arc::new(MemoryWebhookEndpointStore::default());
    let deliveries = Arc::new(MemoryWebhookDeliveryStore {
        deliveries: Mutex::new(Vec::new()),
        endpoints: endpoints.clone(),
    });
    let metrics = Arc::new(RecordingMetrics::default());
    let gateway = Arc::new(MockSettlementGateway::new(gateway_behavior));

    let evaluator = RiskEvaluator {
        risk_scores: scores.clone(),
        fraud_alerts: alerts.clone(),
        device_trust: Arc::new(FixedDeviceTrust::default()),
        ip_intelligence: Arc::new(StaticIpIntelligence::new(Vec::new(), known_bad_ips)),
        model: Arc::new(ColdStartModel::default()),
        metrics: metrics.clone(),
        notifications: Arc::new(LogNotificationSink),
    };

    let dispatcher = WebhookDispatcher {
        endpoints: endpoints.clone(),
        deliveries: deliveries.clone(),
        payments: payments.clone(),
        metrics: metrics.clone(),
        client: reqwest::Client::new(),
        timeout_ms: 1_000,
        max_retries: webhook_retry::MAX_RETRIES,
        inbound_secret: INBOUND_SECRET.to_string(),
    };

    let processor = PaymentProcessor {
        payments: payments.clone(),
        evaluator,
        gateway: gateway.clone(),
        dispatcher: dispatcher.clone(),
        metrics: metrics.clone(),
        notifications: Arc::new(LogNotificationSink),
    };

    Harness {
        payments,
        scores,
        alerts,
        endpoints,
        deliveries,
        metrics,
        gateway,
        processor,
        dispatcher,
    }
}

pub fn endpoint_for(merchant_id: &str, url: &str, secret: &str) -> WebhookEndpoint {
    let now = Utc::now();
    WebhookEndpoint {
        id: Uuid::new_v4(),
        merchant_id: merchant_id.to_string(),
        url: url.to_string(),
        secret: secret.to_string(),
        is_active: true,
        events: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn pending_payment(merchant_id: &str, amount: f64) -> Payment {
    Payment::new(merchant_id, amount, "USD", PaymentMetadata::default())
}
