//! operator-broker: runs built-in and discovered controllers against the
//! current Kubernetes cluster
//!
//! ```text
//! operator-broker --builtin api-probe --controllers 'ctrls/*.ctrl'
//! ```
//!
//! Controllers are registered in order (built-ins first, then discovered
//! paths sorted lexicographically), started, and stopped again when the
//! process receives SIGINT/SIGTERM.

use std::process;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use operator_broker::shutdown::wait_for_shutdown_signal;
use operator_broker::{
    builtin_catalog, rest_api, telemetry, Broker, BrokerConfig, KubeClientFactory,
};

#[tokio::main]
async fn main() {
    let config = BrokerConfig::parse();

    if let Err(e) = run(config).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(config: BrokerConfig) -> anyhow::Result<()> {
    config.validate()?;
    telemetry::init_tracing(&config.log)?;

    let mut broker = Broker::new(
        config.name.as_str(),
        KubeClientFactory::new(config.kube_context.clone()),
    )
    .with_catalog(builtin_catalog());

    for name in &config.builtins {
        broker.load_builtin(name)?;
    }
    if let Some(pattern) = &config.controllers {
        let loaded = broker.load_controllers(pattern)?;
        info!("Discovered {} controller(s) with {}", loaded, pattern);
    }
    if config.has_no_controllers() {
        warn!("No controllers configured; use --builtin or --controllers");
    }

    let shutdown = CancellationToken::new();
    let server = if config.no_http {
        None
    } else {
        Some(tokio::spawn(rest_api::run_server(
            broker.status(),
            config.http_addr,
            shutdown.clone(),
        )))
    };

    let result = drive(&mut broker).await;

    shutdown.cancel();
    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("REST API server failed: {}", e),
            Err(e) => error!("REST API server task panicked: {}", e),
        }
    }

    result
}

/// Start the broker, wait for a signal, stop it
async fn drive(broker: &mut Broker) -> anyhow::Result<()> {
    broker.start().await?;
    info!(
        "Broker {} running {} controller(s)",
        broker.name(),
        broker.len()
    );

    let signal = wait_for_shutdown_signal()
        .await
        .context("Failed to install signal handlers");
    info!("Shutting down broker {}", broker.name());

    broker.stop(true).await?;
    signal
}
