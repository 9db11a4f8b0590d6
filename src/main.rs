use payments_relay::config::{AppConfig, StoreBackend};
use payments_relay::health::monitor::HealthMonitor;
use payments_relay::ledger::SummaryLedger;
use payments_relay::processor::http::HttpProcessorClient;
use payments_relay::processor::ProcessorClient;
use payments_relay::router::worker::{PaymentRouter, RouterSettings};
use payments_relay::store::memory_store::InMemoryStore;
use payments_relay::store::redis_store::RedisStore;
use payments_relay::store::StateStore;
use payments_relay::{build_app, AppState};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let store: Arc<dyn StateStore> = match cfg.store_backend {
        StoreBackend::Redis => Arc::new(RedisStore::connect(&cfg.redis_url, cfg.worker_count).await?),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, state is local to this process");
            Arc::new(InMemoryStore::new())
        }
    };
    let client: Arc<dyn ProcessorClient> = Arc::new(HttpProcessorClient::from_config(&cfg));

    let monitor = HealthMonitor {
        store: store.clone(),
        client: client.clone(),
        interval: cfg.health_check_interval,
        tick: cfg.health_tick,
    };
    tokio::spawn(monitor.run());

    let router = PaymentRouter {
        store: store.clone(),
        client,
        ledger: SummaryLedger::new(store.clone()),
        settings: RouterSettings::from_config(&cfg),
    };
    for worker_id in 0..cfg.worker_count {
        tokio::spawn(router.clone().run(worker_id));
    }

    let app = build_app(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(
        "listening on {} (default={}, fallback={})",
        cfg.bind_addr,
        cfg.default_processor.base_url,
        cfg.fallback_processor.base_url
    );
    axum::serve(listener, app).await?;
    Ok(())
}
