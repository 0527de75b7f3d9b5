//! Trip Planner HTTP 服务
//!
//! 启动: cargo run --bin trip-planner-web --features web [-- path/to/config.toml]
//! 健康检查: curl http://127.0.0.1:8000/health

#![cfg(feature = "web")]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use trip_planner::config::load_config;
use trip_planner::observability;
use trip_planner::server::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load configuration")?;
    observability::init(&cfg.logging);

    let state = Arc::new(AppState::from_config(&cfg));
    let app = router(state, &cfg.server);

    let addr = cfg.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("{} listening on http://{}", cfg.app.name, addr);
    axum::serve(listener, app).await?;

    Ok(())
}
