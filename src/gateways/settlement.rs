use crate::gateways::{GatewayError, SettlementGateway, SettlementPayment};
use crate::signature;
use reqwest::Method;
use serde_json::json;

/// HTTP client for the external settlement network. Every request carries
/// the API key plus an HMAC-SHA256 signature over `body || timestamp`.
pub struct SettlementClient {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl SettlementClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<SettlementPayment, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let payload = match &body {
            Some(value) => value.to_string(),
            None => "{}".to_string(),
        };
        let signed = format!("{payload}{timestamp}");
        let sig = signature::sign(self.api_secret.as_bytes(), signed.as_bytes());

        let mut req = self
            .client
            .request(method.clone(), url)
            .header("Content-Type", "application/json")
            .header("X-Api-Key", &self.api_key)
            .header("X-Timestamp", &timestamp)
            .header("X-Signature", sig)
            .timeout(std::time::Duration::from_millis(self.timeout_ms));
        if method != Method::GET {
            req = req.body(payload);
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => resp
                .json::<SettlementPayment>()
                .await
                .map_err(|e| GatewayError::InvalidResponse(e.to_string())),
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                Err(GatewayError::Http {
                    status,
                    body: body.chars().take(200).collect(),
                })
            }
            Err(e) if e.is_timeout() => Err(GatewayError::Timeout),
            Err(e) => Err(GatewayError::Network(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl SettlementGateway for SettlementClient {
    fn name(&self) -> &'static str {
        "settlement"
    }

    async fn create_payment(
        &self,
        amount: f64,
        memo: &str,
        metadata: &serde_json::Value,
    ) -> Result<SettlementPayment, GatewayError> {
        self.request(
            Method::POST,
            "/payments",
            Some(json!({
                "amount": amount,
                "memo": memo,
                "metadata": metadata,
            })),
        )
        .await
    }

    async fn get_payment(&self, payment_id: &str) -> Result<SettlementPayment, GatewayError> {
        self.request(Method::GET, &format!("/payments/{payment_id}"), None).await
    }

    async fn approve_payment(&self, payment_id: &str) -> Result<SettlementPayment, GatewayError> {
        self.request(Method::POST, &format!("/payments/{payment_id}/approve"), Some(json!({})))
            .await
    }

    async fn complete_payment(
        &self,
        payment_id: &str,
        txid: &str,
    ) -> Result<SettlementPayment, GatewayError> {
        self.request(
            Method::POST,
            &format!("/payments/{payment_id}/complete"),
            Some(json!({ "txid": txid })),
        )
        .await
    }
}
