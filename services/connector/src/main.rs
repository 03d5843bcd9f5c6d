mod annotator;
mod config;
mod connector;
mod decision;
mod http_output;
mod kafka_consumer;
mod sae;
mod storage;

use annotator::Annotator;
use anyhow::{Context, Result};
use config::Config;
use connector::Connector;
use http_output::HttpOutput;
use kafka_consumer::KafkaInput;
use std::sync::Arc;
use storage::{ObjectStore, S3ObjectStore};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting annotation connector"
    );

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    // Initialize outputs; both artifact upload and decision send hang off
    // the same http_output block
    let (store, sink) = match config.http_output.clone() {
        Some(http_config) => {
            let store: Arc<dyn ObjectStore> = Arc::new(
                S3ObjectStore::new(&http_config.s3)
                    .await
                    .context("Failed to initialize object store")?,
            );
            let sink =
                HttpOutput::new(http_config).context("Failed to initialize decision sink")?;
            (Some(store), Some(sink))
        }
        None => {
            info!("No http_output configured, artifacts and decisions will not leave this host");
            (None, None)
        }
    };

    let annotator = Annotator::new(&config.annotation);
    let connector = Arc::new(Connector::new(
        annotator,
        store,
        sink,
        config.local_output.clone(),
    ));

    // Create Kafka input
    let input = Arc::new(KafkaInput::new(&config.kafka).context("Failed to create Kafka input")?);

    // Spawn consumer task
    let consumer_input = input.clone();
    let consumer_handle = tokio::spawn(async move {
        if let Err(e) = consumer_input.run(connector).await {
            error!(error = %e, "Kafka consumer error");
        }
    });

    info!("Annotation connector started successfully");

    // Wait for shutdown signal; the in-flight message finishes first
    shutdown_signal().await;

    info!("Shutting down annotation connector");
    input.shutdown();
    let _ = consumer_handle.await;

    info!("Annotation connector stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
