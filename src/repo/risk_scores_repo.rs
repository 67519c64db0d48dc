use crate::domain::risk::RiskScore;
use crate::store::RiskScoreStore;
use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct RiskScoresRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl RiskScoreStore for RiskScoresRepo {
    async fn insert(&self, score: &RiskScore) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO risk_scores (id, payment_id, merchant_id, score, factors, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(score.id)
        .bind(score.payment_id)
        .bind(&score.merchant_id)
        .bind(score.score)
        .bind(serde_json::to_value(&score.factors)?)
        .bind(score.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_recent_for_merchant(&self, merchant_id: &str, window: Duration) -> Result<i64> {
        let since = Utc::now() - window;
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM risk_scores WHERE merchant_id = $1 AND created_at > $2",
        )
        .bind(merchant_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("n"))
    }
}
