use std::sync::Arc;

use anyhow::Context;
use delay_predictor::{api, AppConfig, AppState, DelayModel, FeatureMatrix, N_FEATURES};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env().context("failed to load configuration")?;
    let mdl = DelayModel::new(cfg.classifier.clone());

    // Warmup to make sure the prediction path answers before we bind
    let probe = mdl.predict(&FeatureMatrix::from_rows(vec![[0.0; N_FEATURES]]));
    tracing::info!("warmup predict ok: {:?} (trained={})", probe, mdl.is_trained());
    tracing::info!("classifier config: {:?}", cfg.classifier);

    let state = AppState {
        model: Arc::new(mdl),
        log_pred: cfg.log_pred,
    };
    let app = api::router(state);

    let addr = cfg.socket_addr()?;
    tracing::info!("{} v{} listening on {}", api::SERVICE_TITLE, env!("CARGO_PKG_VERSION"), addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
