use std::sync::Arc;
use ticket_recon::config::{MatchingConfig, StorageBackend};
use ticket_recon::{api, create_pool, AppConfig, MemoryStore, PgStore, RecordStore, ReconciliationService};
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database).await?;
            info!("Database pool created");
            serve(PgStore::new(pool), config.matching, &addr).await
        }
        StorageBackend::Memory => {
            let store = match &config.storage.seed_dir {
                Some(dir) => MemoryStore::from_csv_dir(dir)?,
                None => MemoryStore::new(Vec::new(), Vec::new(), Vec::new()),
            };
            info!("Using in-memory store");
            serve(store, config.matching, &addr).await
        }
    }
}

async fn serve<S: RecordStore>(
    store: S,
    matching: MatchingConfig,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = Arc::new(ReconciliationService::new(store, matching)?);
    let app = api::router(service).layer(ServiceBuilder::new());

    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/run-matching    - 运行模糊匹配");
    info!("  POST /api/confirm-match   - 确认匹配");
    info!("  GET  /api/matching-stats  - 匹配统计");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
