use crate::opts::SpoolArgs;
use clap::Parser;
use eyre::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use poem::{Server, listener::TcpListener};
use spool_api::{ApiContext, router};
use spool_chain::ChainClient;
use spool_oracle::{Driver, DryRunPublisher, NullSink, OracleState};
use std::{sync::Arc, time::Duration};
use tokio::{
    signal,
    sync::{RwLock, watch},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod opts;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = SpoolArgs::parse();
    let config = args.oracle_config();
    config.validate().context("invalid configuration")?;

    let metrics_handle = PrometheusBuilder::new()
        .add_global_label("network", config.network.clone())
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let adapter = ChainClient::connect(
        args.consensus_endpoint.clone(),
        args.execution_endpoint.clone(),
        config.pool_address,
    )
    .await
    .context("could not connect to the consensus and execution nodes")?;

    let state = Arc::new(RwLock::new(OracleState::new(&config)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let driver = Driver::new(
        adapter.clone(),
        DryRunPublisher,
        NullSink,
        state.clone(),
        config.clone(),
        shutdown_rx.clone(),
    );
    let mut driver_handle = tokio::spawn(driver.run());

    let context = Arc::new(ApiContext {
        state,
        config,
        adapter: Arc::new(adapter),
    });
    let app = router(context, Some(metrics_handle));
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    info!(addr = %api_addr, "starting HTTP API");

    let mut server_shutdown = shutdown_rx;
    let mut server_handle = tokio::spawn(async move {
        Server::new(TcpListener::bind(api_addr))
            .run_with_graceful_shutdown(
                app,
                async move {
                    let _ = server_shutdown.changed().await;
                },
                Some(Duration::from_secs(10)),
            )
            .await
    });

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .context("failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down gracefully"),
        _ = sigint.recv() => info!("received SIGINT, shutting down gracefully"),
        result = &mut driver_handle => {
            // The driver only returns early on an inconsistency.
            server_handle.abort();
            return match result {
                Ok(Ok(())) => {
                    error!("driver exited unexpectedly");
                    Err(eyre::eyre!("driver exited unexpectedly"))
                }
                Ok(Err(err)) => {
                    error!(%err, "driver stopped on error");
                    Err(err).context("driver stopped")
                }
                Err(err) => {
                    error!(%err, "driver task panicked");
                    Err(err).context("driver task panicked")
                }
            };
        }
        result = &mut server_handle => {
            driver_handle.abort();
            return match result {
                Ok(Ok(())) => {
                    error!("HTTP server exited unexpectedly");
                    Err(eyre::eyre!("HTTP server exited unexpectedly"))
                }
                Ok(Err(err)) => Err(err).context("HTTP server failed"),
                Err(err) => Err(err).context("HTTP server task panicked"),
            };
        }
    }

    // Let the driver finish the slot in flight, then drain the server.
    let _ = shutdown_tx.send(true);
    if let Ok(Err(err)) = driver_handle.await {
        error!(%err, "driver failed during shutdown");
    }
    let _ = server_handle.await;

    info!("shutdown complete");
    Ok(())
}
