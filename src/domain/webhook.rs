use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub id: Uuid,
    pub merchant_id: String,
    pub url: String,
    pub secret: String,
    pub is_active: bool,
    /// Subscribed event names; empty means all events.
    pub events: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookEndpoint {
    pub fn subscribes_to(&self, event: &str) -> bool {
        self.events.is_empty() || self.events.iter().any(|e| e == event)
    }
}

/// One outbound notification and its attempt history. Created once per
/// endpoint per event, mutated by each retry attempt up to the ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub event: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub status_code: Option<i32>,
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WebhookDelivery {
    /// A fresh delivery, due immediately.
    pub fn pending(endpoint_id: Uuid, event: &str, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            endpoint_id,
            event: event.to_string(),
            payload,
            attempts: 0,
            status_code: None,
            success: false,
            response: None,
            error: None,
            next_attempt_at: Some(now),
            created_at: now,
        }
    }
}

/// Body shape shared by outbound notifications and inbound status updates:
/// `{event, resource_id, status, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventPayload {
    pub event: String,
    pub resource_id: Uuid,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_subscription_list_means_all_events() {
        let mut endpoint = WebhookEndpoint {
            id: Uuid::new_v4(),
            merchant_id: "m1".to_string(),
            url: "https://example.test/hook".to_string(),
            secret: "s".to_string(),
            is_active: true,
            events: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(endpoint.subscribes_to("payment.updated"));

        endpoint.events = vec!["refund.completed".to_string()];
        assert!(!endpoint.subscribes_to("payment.updated"));
        assert!(endpoint.subscribes_to("refund.completed"));
    }
}
