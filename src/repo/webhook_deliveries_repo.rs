use crate::domain::webhook::{WebhookDelivery, WebhookEndpoint};
use crate::store::{DueDelivery, WebhookDeliveryStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct WebhookDeliveriesRepo {
    pub pool: PgPool,
}

fn row_to_delivery(row: &sqlx::postgres::PgRow) -> WebhookDelivery {
    WebhookDelivery {
        id: row.get("id"),
        endpoint_id: row.get("endpoint_id"),
        event: row.get("event"),
        payload: row.get("payload"),
        attempts: row.get("attempts"),
        status_code: row.get("status_code"),
        success: row.get("success"),
        response: row.get("response"),
        error: row.get("error"),
        next_attempt_at: row.get("next_attempt_at"),
        created_at: row.get("created_at"),
    }
}

#[async_trait::async_trait]
impl WebhookDeliveryStore for WebhookDeliveriesRepo {
    async fn enqueue(&self, delivery: &WebhookDelivery) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO webhook_deliveries (id, endpoint_id, event, payload, attempts, success, state, next_attempt_at, created_at)
            VALUES ($1, $2, $3, $4, 0, false, 'PENDING', $5, $6)
            "#,
        )
        .bind(delivery.id)
        .bind(delivery.endpoint_id)
        .bind(&delivery.event)
        .bind(&delivery.payload)
        .bind(delivery.next_attempt_at)
        .bind(delivery.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn lock_due(&self, batch_size: i64) -> Result<Vec<DueDelivery>> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.endpoint_id, d.event, d.payload, d.attempts, d.status_code, d.success,
                   d.response, d.error, d.next_attempt_at, d.created_at,
                   e.id AS ep_id, e.merchant_id, e.url, e.secret, e.is_active, e.events,
                   e.created_at AS ep_created_at, e.updated_at AS ep_updated_at
            FROM webhook_deliveries d
            JOIN webhook_endpoints e ON e.id = d.endpoint_id
            WHERE d.state = 'PENDING' AND d.next_attempt_at <= now()
            ORDER BY d.next_attempt_at ASC
            LIMIT $1
            FOR UPDATE OF d SKIP LOCKED
            "#,
        )
        .bind(batch_size)
        .fetch_all(tx.as_mut())
        .await?;

        if rows.is_empty() {
            tx.rollback().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.get("id")).collect();
        sqlx::query("UPDATE webhook_deliveries SET state = 'PROCESSING' WHERE id = ANY($1)")
            .bind(&ids)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;

        Ok(rows
            .iter()
            .map(|row| DueDelivery {
                delivery: row_to_delivery(row),
                endpoint: WebhookEndpoint {
                    id: row.get("ep_id"),
                    merchant_id: row.get("merchant_id"),
                    url: row.get("url"),
                    secret: row.get("secret"),
                    is_active: row.get("is_active"),
                    events: row.get("events"),
                    created_at: row.get("ep_created_at"),
                    updated_at: row.get("ep_updated_at"),
                },
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
        let state = if success {
            "DELIVERED"
        } else if next_attempt_at.is_some() {
            "PENDING"
        } else {
            "FAILED"
        };

        sqlx::query(
            r#"
            UPDATE webhook_deliveries
            SET attempts = $2, status_code = $3, success = $4, response = $5, error = $6,
                next_attempt_at = $7, state = $8
            WHERE id = $1
            "#,
        )
        .bind(delivery_id)
        .bind(attempts)
        .bind(status_code)
        .bind(success)
        .bind(response)
        .bind(error)
        .bind(next_attempt_at)
        .bind(state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent_for_merchant(
        &self,
        merchant_id: &str,
        limit: i64,
    ) -> Result<Vec<WebhookDelivery>> {
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.endpoint_id, d.event, d.payload, d.attempts, d.status_code, d.success,
                   d.response, d.error, d.next_attempt_at, d.created_at
            FROM webhook_deliveries d
            JOIN webhook_endpoints e ON e.id = d.endpoint_id
            WHERE e.merchant_id = $1
            ORDER BY d.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(merchant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_delivery).collect())
    }
}
