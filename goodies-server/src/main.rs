//! # Goodies Server
//!
//! An in-memory key-value cache server, reachable over HTTP and/or TCP, with
//! periodic snapshot persistence.
//!
//! ## Design Principles
//!
//! 1. **Single Responsibility**: CLI parsing, transports, and metrics are
//!    isolated in modules.
//! 2. **Async First**: Tokio drives both transports on one runtime.
//! 3. **Fail-Open Defaults**: Protocol errors are localized to one request or
//!    connection; only listener-level failures are fatal.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use goodies_engine::{CommandProcessor, Persister, Store};
use goodies_server::cli::Args;
use goodies_server::http;
use goodies_server::metrics::Metrics;
use goodies_server::tcp;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let initial = if args.persistence_enabled() {
        goodies_engine::persist::load(&args.file)
    } else {
        Default::default()
    };

    let store = Arc::new(Store::from_map(initial, Duration::from_secs(args.ttl)));
    let processor = Arc::new(CommandProcessor::new(store.clone()));
    let metrics = Arc::new(Metrics::new());

    let mut persister = if args.persistence_enabled() {
        Some(Persister::spawn(
            store.clone(),
            args.file.clone(),
            Duration::from_secs(args.stor),
        ))
    } else {
        None
    };

    let mut tasks = Vec::new();

    if args.bind_tcp() {
        let tcp_addr = format!("0.0.0.0:{}", args.port);
        let listener = TcpListener::bind(&tcp_addr)
            .await
            .with_context(|| format!("binding tcp listener on {tcp_addr}"))?;
        tracing::info!(addr = %tcp_addr, "tcp transport listening");
        let processor = processor.clone();
        let metrics = metrics.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(err) = tcp::serve(listener, processor, metrics).await {
                tracing::error!(%err, "tcp transport stopped");
            }
        }));
    }

    if args.bind_http() {
        let http_port = args.resolved_http_port();
        let http_addr = format!("0.0.0.0:{http_port}");
        let listener = TcpListener::bind(&http_addr)
            .await
            .with_context(|| format!("binding http listener on {http_addr}"))?;
        tracing::info!(addr = %http_addr, "http transport listening");
        let state = Arc::new(http::HttpState {
            processor: processor.clone(),
            metrics: metrics.clone(),
        });
        let router = http::router(state);
        tasks.push(tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                tracing::error!(%err, "http transport stopped");
            }
        }));
    }

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("shutdown requested");

    if let Some(persister) = persister.as_mut() {
        persister.stop().await;
    }

    for task in tasks {
        task.abort();
    }

    Ok(())
}

fn init_tracing(debug: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter_level(debug)))
        .init();
}

fn filter_level(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_flips_the_tracing_filter_level() {
        assert_eq!(filter_level(false), "info");
        assert_eq!(filter_level(true), "debug");
    }
}
