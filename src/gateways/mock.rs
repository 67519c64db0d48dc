use crate::gateways::{GatewayError, SettlementGateway, SettlementPayment};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Behavior-scripted stand-in for the settlement network, used in local dev
/// (no API credentials) and in tests. Counts create calls so tests can
/// assert the gateway was never reached.
pub struct MockSettlementGateway {
    pub behavior: String,
    pub create_calls: AtomicUsize,
}

impl MockSettlementGateway {
    pub fn new(behavior: &str) -> Self {
        Self {
            behavior: behavior.to_string(),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn respond(&self) -> Result<SettlementPayment, GatewayError> {
        match self.behavior.as_str() {
            "ALWAYS_FAILURE" => Err(GatewayError::Http {
                status: 400,
                body: "mock decline".to_string(),
            }),
            "ALWAYS_TIMEOUT" => Err(GatewayError::Timeout),
            _ => Ok(SettlementPayment {
                id: format!("mock_pay_{}", uuid::Uuid::new_v4()),
                status: Some("created".to_string()),
                txid: None,
            }),
        }
    }
}

#[async_trait::async_trait]
impl SettlementGateway for MockSettlementGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_payment(
        &self,
        _amount: f64,
        _memo: &str,
        _metadata: &serde_json::Value,
    ) -> Result<SettlementPayment, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.respond()
    }

    async fn get_payment(&self, payment_id: &str) -> Result<SettlementPayment, GatewayError> {
        self.respond().map(|mut p| {
            p.id = payment_id.to_string();
            p
        })
    }

    async fn approve_payment(&self, payment_id: &str) -> Result<SettlementPayment, GatewayError> {
        self.get_payment(payment_id).await
    }

    async fn complete_payment(
        &self,
        payment_id: &str,
        txid: &str,
    ) -> Result<SettlementPayment, GatewayError> {
        self.respond().map(|mut p| {
            p.id = payment_id.to_string();
            p.txid = Some(txid.to_string());
            p
        })
    }
}
