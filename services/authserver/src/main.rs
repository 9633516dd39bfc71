use anyhow::Context;
use authserver::{app, config, observability};
use std::net::SocketAddr;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let metrics_handle = observability::init_observability();

    let config_path = std::env::args()
        .nth(1)
        .context("usage: authserver <config.yml|config.json>")?;
    let config = config::load(Path::new(&config_path), "AUTH")
        .with_context(|| format!("load {config_path}"))?;

    if let Some(metrics_addr) = &config.server.metrics_addr {
        let addr: SocketAddr = metrics_addr.parse().context("parse server.metrics_addr")?;
        tokio::spawn(observability::serve_metrics(metrics_handle, addr));
    }

    let state = app::build_state(config).await?;
    let router = app::build_router(state.clone());

    let addr = state.config.server.addr.clone();
    let net = state.config.server.net.clone();
    tracing::info!(%addr, %net, "auth server listening");
    if net == "unix" {
        // A stale socket file from a previous run would make bind fail.
        let _ = tokio::fs::remove_file(&addr).await;
        let listener = tokio::net::UnixListener::bind(&addr)
            .with_context(|| format!("bind unix socket {addr}"))?;
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        // Accept the common ":5001" shorthand for all-interfaces.
        let bind_addr = if addr.starts_with(':') {
            format!("0.0.0.0{addr}")
        } else {
            addr
        };
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("bind {bind_addr}"))?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    }

    state.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}
