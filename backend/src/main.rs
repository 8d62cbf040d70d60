use std::sync::Arc;
use swaprouter_backend::{
    aggregator::SwapAggregator,
    api::{create_app, ApiState},
    config,
};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_logging();

    let config = config::load_config()?;
    info!(
        "⚙️ Loaded config: default chain {}, {} deployment(s)",
        config.default_chain_id,
        config.deployments.len()
    );

    let aggregator = match SwapAggregator::new(&config) {
        Ok(aggregator) => {
            info!("✅ Swap aggregator initialized for chains {:?}", aggregator.chain_ids());
            Arc::new(aggregator)
        }
        Err(e) => {
            error!("❌ Failed to initialize swap aggregator: {}", e);
            return Err(e.into());
        }
    };

    let app = create_app(ApiState::new(aggregator));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("🚀 Swap router backend listening on http://{}", addr);
    info!("📊 Health check: http://{}/health", addr);
    info!("💱 Quotes: http://{}/api/v1/quote/amounts-out", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
