use serde_json::json;

/// Best-effort counter/gauge sink. Implementations must never block the
/// pipeline or surface failures to callers.
#[async_trait::async_trait]
pub trait MetricsSink: Send + Sync {
    async fn record(&self, name: &str, value: f64, tags: &[(&str, String)]);
}

/// Appends metric points to a capped Redis stream for the aggregation side.
pub struct RedisMetricsSink {
    pub client: redis::Client,
    pub stream_key: String,
}

#[async_trait::async_trait]
impl MetricsSink for RedisMetricsSink {
    async fn record(&self, name: &str, value: f64, tags: &[(&str, String)]) {
        let tag_json = json!(tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<std::collections::BTreeMap<_, _>>())
        .to_string();

        let result: redis::RedisResult<String> = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            redis::cmd("XADD")
                .arg(&self.stream_key)
                .arg("MAXLEN")
                .arg("~")
                .arg(1_000_000)
                .arg("*")
                .arg("name")
                .arg(name)
                .arg("value")
                .arg(value)
                .arg("tags")
                .arg(tag_json)
                .arg("ts")
                .arg(chrono::Utc::now().timestamp_millis())
                .query_async(&mut conn)
                .await
        }
        .await;

        if let Err(err) = result {
            tracing::warn!("metric {} dropped: {}", name, err);
        }
    }
}

pub struct NullMetricsSink;

#[async_trait::async_trait]
impl MetricsSink for NullMetricsSink {
    async fn record(&self, _name: &str, _value: f64, _tags: &[(&str, String)]) {}
}
