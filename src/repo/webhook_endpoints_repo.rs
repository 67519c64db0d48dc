use crate::domain::webhook::WebhookEndpoint;
use crate::store::WebhookEndpointStore;
use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct WebhookEndpointsRepo {
    pub pool: PgPool,
}

fn row_to_endpoint(row: &sqlx::postgres::PgRow) -> WebhookEndpoint {
    WebhookEndpoint {
        id: row.get("id"),
        merchant_id: row.get("merchant_id"),
        url: row.get("url"),
        secret: row.get("secret"),
        is_active: row.get("is_active"),
        events: row.get("events"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait::async_trait]
impl WebhookEndpointStore for WebhookEndpointsRepo {
    async fn insert(&self, endpoint: &WebhookEndpoint) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO webhook_endpoints (id, merchant_id, url, secret, is_active, events, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(endpoint.id)
        .bind(&endpoint.merchant_id)
        .bind(&endpoint.url)
        .bind(&endpoint.secret)
        .bind(endpoint.is_active)
        .bind(&endpoint.events)
        .bind(endpoint.created_at)
        .bind(endpoint.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active(&self, merchant_id: &str) -> Result<Vec<WebhookEndpoint>> {
        let rows = sqlx::query(
            r#"
            SELECT id, merchant_id, url, secret, is_active, events, created_at, updated_at
            FROM webhook_endpoints
            WHERE merchant_id = $1 AND is_active = true
            "#,
        )
        .bind(merchant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_endpoint).collect())
    }

    async fn get(&self, merchant_id: &str, endpoint_id: Uuid) -> Result<Option<WebhookEndpoint>> {
        let row = sqlx::query(
            r#"
            SELECT id, merchant_id, url, secret, is_active, events, created_at, updated_at
            FROM webhook_endpoints
            WHERE id = $1 AND merchant_id = $2
            "#,
        )
        .bind(endpoint_id)
        .bind(merchant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_endpoint))
    }

    async fn deactivate(&self, merchant_id: &str, endpoint_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE webhook_endpoints SET is_active = false, updated_at = now() WHERE id = $1 AND merchant_id = $2",
        )
        .bind(endpoint_id)
        .bind(merchant_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
