#![forbid(unsafe_code)]

//! Gateway server binary: loads configuration, builds the shared state and
//! serves the router until ctrl-c.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::signal;
use tubegate::config::load_gateway_config;
use tubegate::gateway::{AppState, router};
use tubegate::security::ensure_not_root;

#[tokio::main]
async fn main() -> Result<()> {
    ensure_not_root("gateway")?;

    let mut config = load_gateway_config().context("loading gateway configuration")?;

    // Environment variables override the config file, same keys.
    if let Some(port) = std::env::var("TUBEGATE_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.port = port;
    }
    if let Ok(host) = std::env::var("TUBEGATE_HOST")
        && !host.is_empty()
    {
        config.host = host;
    }

    let state = AppState::new(&config);
    let app = router(state);

    let addr = SocketAddr::new(
        config.host.parse().context("parsing listen host")?,
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    println!("Gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running gateway")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        eprintln!("Failed to install Ctrl+C handler: {}", err);
    }
}
