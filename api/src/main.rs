use anyhow::Result;
use market_data::config::PipelineConfig;
use market_data::service::MarketDataService;
use shared::Config;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod handlers;

/// How often rows past the retention window are swept
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_json);

    info!("Starting market data API server...");

    let pipeline = PipelineConfig::from_shared(&config);
    let service = Arc::new(MarketDataService::connect(&config.database_url, &pipeline).await?);
    info!("Connected to database at {}", config.database_url);

    spawn_retention_sweep(service.clone());

    let app = handlers::router(service)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("API server listening on http://{}", config.bind_addr);
    info!("  GET /health");
    info!("  GET /api/stats");
    info!("  GET /api/candles/:symbol?interval=1h&period=30d&force_refresh=false");
    info!("  GET /api/indicators/:symbol?timeframe=1h&period=30d&indicators=rsi,macd&current_price=");

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn spawn_retention_sweep(service: Arc<MarketDataService>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = service.purge_expired().await {
                error!("Retention sweep failed: {}", e);
            }
        }
    });
}
