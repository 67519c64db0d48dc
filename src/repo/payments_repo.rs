use crate::domain::payment::{parse_status, Payment, PaymentMetadata, PaymentStatus};
use crate::store::PaymentStore;
use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PaymentsRepo {
    pub pool: PgPool,
}

fn row_to_payment(row: &sqlx::postgres::PgRow) -> Result<Payment> {
    let metadata: serde_json::Value = row.get("metadata");
    Ok(Payment {
        payment_id: row.get("payment_id"),
        merchant_id: row.get("merchant_id"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        status: parse_status(row.get("status")),
        metadata: serde_json::from_value(metadata)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait::async_trait]
impl PaymentStore for PaymentsRepo {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, merchant_id, amount, currency, status, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.payment_id)
        .bind(&payment.merchant_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(serde_json::to_value(&payment.metadata)?)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, payment_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT payment_id, merchant_id, amount, currency, status, metadata, created_at, updated_at
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_payment).transpose()
    }

    async fn claim_pending(&self, payment_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'PROCESSING', updated_at = now() WHERE payment_id = $1 AND status = 'PENDING'",
        )
        .bind(payment_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn save_outcome(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        metadata: &PaymentMetadata,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE payments SET status = $2, metadata = $3, updated_at = now() WHERE payment_id = $1",
        )
        .bind(payment_id)
        .bind(status.as_str())
        .bind(serde_json::to_value(metadata)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<()> {
        sqlx::query("UPDATE payments SET status = $2, updated_at = now() WHERE payment_id = $1")
            .bind(payment_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
