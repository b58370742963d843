use std::sync::Arc;

use lordlaser::api::{ApiState, api_routes};
use lordlaser::config::AppConfig;
use lordlaser::error::Result;
use lordlaser::logging;
use lordlaser::pipeline::IntakePipeline;
use lordlaser::store::LibSqlBackend;
use lordlaser::translate::LibreTranslateClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    logging::init(&config.log)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        messages = %config.tables.messages,
        blocklist = %config.tables.blocklist,
        throttle_mode = %config.pipeline.throttle_mode,
        "Starting lordlaser"
    );

    // ── Database ─────────────────────────────────────────────────────────
    let db = Arc::new(LibSqlBackend::new_local(&config.db_path, config.tables.clone()).await?);
    db.ensure_tables().await?;
    tracing::info!(path = %config.db_path.display(), "Database ready");

    // ── Translator ───────────────────────────────────────────────────────
    let translator = Arc::new(LibreTranslateClient::new(config.translator.clone())?);
    tracing::info!(
        url = %config.translator.base_url,
        target = %config.translator.target_language,
        "Translator configured"
    );

    // ── Pipeline + API ───────────────────────────────────────────────────
    let pipeline = Arc::new(IntakePipeline::new(
        config.pipeline.clone(),
        db.clone(),
        db.clone(),
        translator,
    ));
    let app = api_routes(ApiState {
        pipeline,
        messages: db.clone(),
        blocklist: db,
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.api.port)).await?;
    tracing::info!(port = config.api.port, "API server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
