//! hashdropd — runs the producer or the consumer service.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use hashdrop_api::{ConsumerState, ProducerState};
use hashdrop_core::config::{ConsumerConfig, HashdropConfig, LogBackend};
use hashdrop_services::{
    HttpPayloadSource, MemoryLog, PayloadGenerator, SqliteLog, TransferClient, TransferSettings,
    VerificationLog,
};

fn print_usage() {
    println!("Usage: hashdropd <producer|consumer>");
    println!();
    println!("Configuration is read from $HASHDROP_CONFIG or");
    println!("$XDG_CONFIG_HOME/hashdrop/config.toml; HASHDROP_<SECTION>__<FIELD>");
    println!("environment variables override the file.");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let role = std::env::args().nth(1);
    let role = match role.as_deref() {
        Some(r @ ("producer" | "consumer")) => r.to_string(),
        Some("help" | "--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        other => {
            eprintln!("Unknown role: {}", other.unwrap_or(""));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    // Load config
    if let Err(e) = HashdropConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = HashdropConfig::load().context("failed to load configuration")?;
    tracing::info!(role, config = %HashdropConfig::file_path().display(), "hashdropd starting");

    let server = if role == "producer" {
        tokio::spawn(run_producer(config))
    } else {
        tokio::spawn(run_consumer(config))
    };

    tokio::select! {
        r = tokio::signal::ctrl_c() => {
            r.context("failed to listen for shutdown signal")?;
            tracing::info!("shutdown signal received");
        }
        r = server => {
            r.context("server task panicked")??;
            tracing::error!("server exited");
        }
    }

    Ok(())
}

async fn run_producer(config: HashdropConfig) -> Result<()> {
    let spec = config.payload.spec().context("invalid payload settings")?;
    let path = config.producer.payload_path();
    let generator = PayloadGenerator::new(spec, Some(path.clone()));
    tracing::info!(
        path = %path.display(),
        size = generator.spec().size(),
        "payload generator ready"
    );

    let listener = bind(&config.producer.bind_addr, config.producer.port).await?;
    hashdrop_api::serve_producer(listener, ProducerState { generator }).await
}

async fn run_consumer(config: HashdropConfig) -> Result<()> {
    let consumer = &config.consumer;
    let log = open_log(consumer)?;

    let source = HttpPayloadSource::new(&consumer.producer_url, consumer.request_timeout())
        .context("failed to build producer client")?;
    tracing::info!(
        producer = source.base_url(),
        timeout_secs = consumer.request_timeout_secs,
        "producer source ready"
    );

    let client = TransferClient::new(
        Arc::new(source),
        log,
        TransferSettings {
            payload_name: consumer.payload_name.clone(),
            destination: consumer.destination(),
        },
    );

    let listener = bind(&consumer.bind_addr, consumer.port).await?;
    hashdrop_api::serve_consumer(listener, ConsumerState::new(client)).await
}

/// Open the configured record sink. Failing here stops the daemon.
fn open_log(consumer: &ConsumerConfig) -> Result<Arc<dyn VerificationLog>> {
    match consumer.log.backend {
        LogBackend::Sqlite => {
            let path = &consumer.log.path;
            let log = SqliteLog::open(path)
                .with_context(|| format!("failed to open verification log at {}", path.display()))?;
            tracing::info!(path = %path.display(), "verification log opened");
            Ok(Arc::new(log))
        }
        LogBackend::Memory => {
            tracing::warn!("using in-memory verification log; records are lost on restart");
            Ok(Arc::new(MemoryLog::new()))
        }
    }
}

async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))
}
