use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;
use merchant_gateway::config::AppConfig;
use merchant_gateway::fraud::evaluator::RiskEvaluator;
use merchant_gateway::fraud::fingerprint::FixedDeviceTrust;
use merchant_gateway::fraud::ip::StaticIpIntelligence;
use merchant_gateway::fraud::ml::ColdStartModel;
use merchant_gateway::gateways::mock::MockSettlementGateway;
use merchant_gateway::gateways::settlement::SettlementClient;
use merchant_gateway::gateways::SettlementGateway;
use merchant_gateway::metrics::RedisMetricsSink;
use merchant_gateway::notify::LogNotificationSink;
use merchant_gateway::repo::fraud_alerts_repo::FraudAlertsRepo;
use merchant_gateway::repo::payments_repo::PaymentsRepo;
use merchant_gateway::repo::risk_scores_repo::RiskScoresRepo;
use merchant_gateway::repo::webhook_deliveries_repo::WebhookDeliveriesRepo;
use merchant_gateway::repo::webhook_endpoints_repo::WebhookEndpointsRepo;
use merchant_gateway::service::payment_processor::PaymentProcessor;
use merchant_gateway::service::webhook_dispatcher::WebhookDispatcher;
use merchant_gateway::service::webhook_retry;
use merchant_gateway::service::webhook_worker::WebhookDeliveryWorker;
use merchant_gateway::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let payments_repo = Arc::new(PaymentsRepo { pool: pool.clone() });
    let risk_scores_repo = Arc::new(RiskScoresRepo { pool: pool.clone() });
    let fraud_alerts_repo = FraudAlertsRepo { pool: pool.clone() };
    let webhook_endpoints_repo = WebhookEndpointsRepo { pool: pool.clone() };
    let webhook_deliveries_repo = WebhookDeliveriesRepo { pool: pool.clone() };

    let metrics = Arc::new(RedisMetricsSink {
        client: redis::Client::open(cfg.redis_url.clone())?,
        stream_key: cfg.metrics_stream_key.clone(),
    });
    let notifications = Arc::new(LogNotificationSink);

    let evaluator = RiskEvaluator {
        risk_scores: risk_scores_repo.clone(),
        fraud_alerts: Arc::new(fraud_alerts_repo.clone()),
        device_trust: Arc::new(FixedDeviceTrust::default()),
        ip_intelligence: Arc::new(StaticIpIntelligence::new(
            cfg.high_risk_countries.clone(),
            cfg.known_bad_ips.clone(),
        )),
        model: Arc::new(ColdStartModel::default()),
        metrics: metrics.clone(),
        notifications: notifications.clone(),
    };

    let gateway: Arc<dyn SettlementGateway> = if cfg.gateway_api_key.is_empty() {
        tracing::warn!("GATEWAY_API_KEY not set, using mock settlement gateway");
        Arc::new(MockSettlementGateway::new("ALWAYS_SUCCESS"))
    } else {
        Arc::new(SettlementClient {
            base_url: cfg.gateway_base_url.clone(),
            api_key: cfg.gateway_api_key.clone(),
            api_secret: cfg.gateway_api_secret.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client: reqwest::Client::new(),
        })
    };

    let webhook_dispatcher = WebhookDispatcher {
        endpoints: Arc::new(webhook_endpoints_repo.clone()),
        deliveries: Arc::new(webhook_deliveries_repo.clone()),
        payments: payments_repo.clone(),
        metrics: metrics.clone(),
        client: reqwest::Client::new(),
        timeout_ms: cfg.webhook_timeout_ms,
        max_retries: webhook_retry::MAX_RETRIES,
        inbound_secret: cfg.webhook_secret.clone(),
    };

    let payment_processor = PaymentProcessor {
        payments: payments_repo,
        evaluator,
        gateway,
        dispatcher: webhook_dispatcher.clone(),
        metrics: metrics.clone(),
        notifications,
    };

    let worker = WebhookDeliveryWorker {
        dispatcher: webhook_dispatcher.clone(),
        deliveries: Arc::new(webhook_deliveries_repo.clone()),
        batch_size: 100,
        poll_interval_ms: 500,
    };
    tokio::spawn(worker.run());

    let state = AppState {
        payment_processor,
        webhook_dispatcher,
        webhook_endpoints_repo,
        webhook_deliveries_repo,
        fraud_alerts_repo,
    };

    let admin_key = cfg.internal_api_key.clone();
    let admin_routes = Router::new()
        .route(
            "/fraud-alerts/:alert_id/resolve",
            post(merchant_gateway::http::handlers::fraud_alerts::resolve_alert),
        )
        .layer(from_fn_with_state(
            admin_key,
            merchant_gateway::http::middleware::admin_auth::require_internal_api_key,
        ));

    let app = Router::new()
        .route("/health", get(merchant_gateway::http::handlers::payments::health))
        .route("/payments", post(merchant_gateway::http::handlers::payments::create_payment))
        .route(
            "/payments/:payment_id",
            get(merchant_gateway::http::handlers::payments::get_payment),
        )
        .route("/webhooks", post(merchant_gateway::http::handlers::webhooks::inbound_webhook))
        .route(
            "/merchants/:merchant_id/webhook-endpoints",
            post(merchant_gateway::http::handlers::webhooks::create_endpoint)
                .get(merchant_gateway::http::handlers::webhooks::list_endpoints),
        )
        .route(
            "/merchants/:merchant_id/webhook-endpoints/:endpoint_id",
            delete(merchant_gateway::http::handlers::webhooks::delete_endpoint),
        )
        .route(
            "/merchants/:merchant_id/webhook-endpoints/:endpoint_id/test",
            post(merchant_gateway::http::handlers::webhooks::send_test_webhook),
        )
        .route(
            "/merchants/:merchant_id/webhook-deliveries",
            get(merchant_gateway::http::handlers::webhooks::list_deliveries),
        )
        .merge(admin_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
