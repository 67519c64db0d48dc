use crate::domain::risk::FraudAlert;
use crate::store::FraudAlertStore;
use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct FraudAlertsRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl FraudAlertStore for FraudAlertsRepo {
    async fn insert(&self, alert: &FraudAlert) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fraud_alerts (id, alert_type, payment_id, merchant_id, description, resolved, created_at)
            VALUES ($1, $2, $3, $4, $5, false, $6)
            "#,
        )
        .bind(alert.id)
        .bind(alert.alert_type.as_str())
        .bind(alert.payment_id)
        .bind(&alert.merchant_id)
        .bind(&alert.description)
        .bind(alert.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_unresolved_for_merchant(
        &self,
        merchant_id: &str,
        window: Duration,
    ) -> Result<i64> {
        let since = Utc::now() - window;
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM fraud_alerts WHERE merchant_id = $1 AND resolved = false AND created_at > $2",
        )
        .bind(merchant_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("n"))
    }

    async fn resolve(&self, alert_id: Uuid, resolved_by: &str, resolution: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE fraud_alerts SET resolved = true, resolved_by = $2, resolution = $3 WHERE id = $1 AND resolved = false",
        )
        .bind(alert_id)
        .bind(resolved_by)
        .bind(resolution)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
