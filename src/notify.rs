/// Human-facing alerting collaborator. Fire-and-forget: implementations log
/// failures and never propagate them into the pipeline.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_account_notification(
        &self,
        recipient: &str,
        title: &str,
        message: &str,
        metadata: serde_json::Value,
    );
}

/// Default sink: structured log lines in place of the external transport.
pub struct LogNotificationSink;

#[async_trait::async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send_account_notification(
        &self,
        recipient: &str,
        title: &str,
        message: &str,
        metadata: serde_json::Value,
    ) {
        tracing::info!(recipient, title, message, %metadata, "account notification");
    }
}
