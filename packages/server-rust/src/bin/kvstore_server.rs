//! `kvstore-server`: runs the key-value service until interrupted.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use kvstore_server::{KvServer, ServerConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "kvstore-server", version, about = "In-memory key-value store service")]
struct Args {
    /// JSON configuration file. Flags below override its values.
    #[arg(long, env = "KVSTORE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "KVSTORE_HOST")]
    host: Option<String>,

    #[arg(long, env = "KVSTORE_PORT")]
    port: Option<u16>,

    /// Number of event queues.
    #[arg(long)]
    queues: Option<usize>,

    /// Worker threads per event queue.
    #[arg(long)]
    threads_per_queue: Option<usize>,

    /// Storage engine: `skiplist` or `ordered_map`.
    #[arg(long)]
    engine: Option<String>,

    /// Address for the Prometheus scrape endpoint.
    #[arg(long, env = "KVSTORE_METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(ServerConfig, bool)> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_path(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = self.host {
            config.network.host = host;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(queues) = self.queues {
            config.service.queue_count = queues;
        }
        if let Some(threads) = self.threads_per_queue {
            config.service.threads_per_queue = threads;
        }
        if let Some(engine) = self.engine {
            config.storage.engine = engine;
        }
        if self.metrics_addr.is_some() {
            config.metrics_addr = self.metrics_addr;
        }
        Ok((config, self.log_json))
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_thread_names(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true).with_thread_names(true)).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, log_json) = Args::parse().into_config()?;
    init_tracing(log_json);

    if let Some(addr) = config.metrics_socket_addr()? {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        info!(%addr, "Prometheus metrics endpoint listening");
    }

    let server = KvServer::bind(&config).await?;
    info!(
        port = server.port(),
        engine = server.storage().name(),
        queues = config.service.queue_count,
        threads_per_queue = config.service.threads_per_queue,
        "kvstore server ready"
    );
    server.run(shutdown_signal()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "kvstore-server",
            "--port",
            "7000",
            "--queues",
            "8",
            "--engine",
            "ordered_map",
            "--log-json",
        ]);
        let (config, json) = args.into_config().unwrap();
        assert_eq!(config.network.port, 7000);
        assert_eq!(config.service.queue_count, 8);
        assert_eq!(config.service.threads_per_queue, 2);
        assert_eq!(config.storage.engine, "ordered_map");
        assert!(json);
    }

    #[test]
    fn args_are_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
