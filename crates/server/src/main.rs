//! # Server — pkvs HTTP + CLI adapter
//!
//! Parses CLI flags into a [`config::Config`], spawns one execution unit
//! thread per configured unit via [`shard::Dispatcher`], and serves the
//! HTTP surface over axum. This binary owns no engine invariants — it only
//! marshals requests in and responses out.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use server::routes;
use shard::Dispatcher;
use tracing_subscriber::EnvFilter;

/// pkvs — a partitioned, log-structured key-value store.
#[derive(Parser, Debug)]
#[command(name = "pkvs-server")]
#[command(about = "pkvs storage engine HTTP server")]
struct Args {
    /// HTTP listen port.
    #[arg(long, default_value_t = config::Config::default().port)]
    port: u16,

    /// Per-partition soft memory budget, in bytes, before eviction kicks in.
    #[arg(long, default_value_t = config::Config::default().memory_threshold)]
    memory_threshold: u64,

    /// Number of execution units (one OS thread per unit).
    #[arg(long, default_value_t = config::Config::default().units)]
    units: usize,

    /// Root directory for all partition state.
    #[arg(long, default_value = "pkvs_data")]
    data_dir: PathBuf,
}

impl From<Args> for config::Config {
    fn from(args: Args) -> Self {
        config::Config {
            port: args.port,
            memory_threshold: args.memory_threshold,
            units: args.units,
            data_dir: args.data_dir,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg: config::Config = Args::parse().into();
    cfg.ensure_units_marker()?;

    tracing::info!(
        port = cfg.port,
        units = cfg.units,
        memory_threshold = cfg.memory_threshold,
        data_dir = %cfg.data_dir.display(),
        "starting pkvs"
    );

    let addr = format!("0.0.0.0:{}", cfg.port);
    let dispatcher = Arc::new(Dispatcher::spawn(cfg)?);
    let app = routes::router(dispatcher.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");
    Arc::try_unwrap(dispatcher)
        .map(Dispatcher::shutdown)
        .unwrap_or_else(|_| tracing::warn!("dispatcher still referenced at shutdown"));

    Ok(())
}

/// Waits for SIGINT or (on unix) SIGTERM. In-flight requests are allowed to
/// complete by axum's graceful shutdown; unflushed dirty memtable entries
/// are lost by design — there is no write-ahead log.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
