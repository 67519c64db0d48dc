use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod mock;
pub mod settlement;

/// Transport/HTTP failures talking to the settlement network. Distinct from
/// fraud rejection: these propagate to the processing caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("settlement network timed out")]
    Timeout,
    #[error("settlement network returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network error talking to settlement network: {0}")]
    Network(String),
    #[error("unreadable settlement network response: {0}")]
    InvalidResponse(String),
}

/// Payment representation on the settlement network side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementPayment {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub txid: Option<String>,
}

#[async_trait::async_trait]
pub trait SettlementGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_payment(
        &self,
        amount: f64,
        memo: &str,
        metadata: &serde_json::Value,
    ) -> Result<SettlementPayment, GatewayError>;

    async fn get_payment(&self, payment_id: &str) -> Result<SettlementPayment, GatewayError>;

    async fn approve_payment(&self, payment_id: &str) -> Result<SettlementPayment, GatewayError>;

    async fn complete_payment(
        &self,
        payment_id: &str,
        txid: &str,
    ) -> Result<SettlementPayment, GatewayError>;
}
