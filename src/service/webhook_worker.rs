use crate::service::webhook_dispatcher::WebhookDispatcher;
use crate::service::webhook_retry;
use crate::store::WebhookDeliveryStore;
use anyhow::Result;
use std::sync::Arc;

/// Drives the durable delivery queue: locks due deliveries, attempts them,
/// and reschedules failures with exponential backoff until the retry
/// ceiling. Because the schedule lives on the delivery row, a restart
/// resumes exactly where the previous process stopped.
#[derive(Clone)]
pub struct WebhookDeliveryWorker {
    pub dispatcher: WebhookDispatcher,
    pub deliveries: Arc<dyn WebhookDeliveryStore>,
    pub batch_size: i64,
    pub poll_interval_ms: u64,
}

impl WebhookDeliveryWorker {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                tracing::error!("webhook delivery worker error: {err:#}");
            }
            tokio::time::sleep(std::time::Duration::from_millis(self.poll_interval_ms)).await;
        }
    }

    pub async fn tick(&self) -> Result<()> {
        let due = self.deliveries.lock_due(self.batch_size).await?;
        for item in due {
            let outcome = self.dispatcher.attempt(&item.endpoint, &item.delivery).await;
            let attempts = item.delivery.attempts + 1;
            let next_attempt_at = webhook_retry::plan_next_attempt(
                attempts,
                outcome.success,
                self.dispatcher.max_retries,
                chrono::Utc::now(),
            );

            if !outcome.success && next_attempt_at.is_none() {
                tracing::warn!(
                    delivery_id = %item.delivery.id,
                    endpoint_id = %item.endpoint.id,
                    attempts,
                    "webhook delivery exhausted retries"
                );
                self.dispatcher
                    .metrics
                    .record(
                        "webhooks.delivery_exhausted",
                        1.0,
                        &[("event", item.delivery.event.clone())],
                    )
                    .await;
            }
            self.dispatcher
                .metrics
                .record(
                    "webhooks.delivery_attempt",
                    1.0,
                    &[
                        ("event", item.delivery.event.clone()),
                        ("success", outcome.success.to_string()),
                    ],
                )
                .await;

            self.deliveries
                .record_attempt(
                    item.delivery.id,
                    attempts,
                    outcome.status_code,
                    outcome.success,
                    outcome.response,
                    outcome.error,
                    next_attempt_at,
                )
                .await?;
        }

        Ok(())
    }
}
