//! Audio denoising worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cwave_media::SpectralGate;
use cwave_queue::QueueConsumer;
use cwave_storage::ObjectStoreClient;
use cwave_worker::{metrics, AudioPipeline, FfmpegTranscoder, WorkerConfig, WorkerLoop};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("cwave=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
            )
            .with(env_filter)
            .init();
    }

    info!("Starting cwave-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Optional Prometheus scrape endpoint
    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    if metrics_enabled {
        let addr = std::env::var("METRICS_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:9100".to_string())
            .parse()
            .expect("Invalid METRICS_ADDR");
        info!("Prometheus metrics enabled on {}", addr);
        metrics::init_metrics(addr);
    }

    // Create queue consumer
    let queue = match QueueConsumer::from_env().await {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("Failed to create queue consumer: {}", e);
            std::process::exit(1);
        }
    };

    // Create object store client
    let store = match ObjectStoreClient::from_env().await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create object store client: {}", e);
            std::process::exit(1);
        }
    };

    // Local emulation starts empty; production buckets already exist
    for bucket in [&config.input_bucket, &config.output_bucket] {
        if let Err(e) = store.ensure_bucket(bucket).await {
            error!("Failed to ensure bucket {}: {}", bucket, e);
            std::process::exit(1);
        }
    }

    let transcoder = Arc::new(FfmpegTranscoder::new(config.transcode_timeout.as_secs()));
    let denoiser = Arc::new(SpectralGate::default());

    let pipeline = AudioPipeline::new(config.clone(), store, transcoder, denoiser);
    let worker = Arc::new(WorkerLoop::new(config, queue, pipeline));

    // Setup signal handler
    let shutdown_worker = Arc::clone(&worker);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_worker.shutdown();
    });

    // Run the loop
    if let Err(e) = worker.run().await {
        error!("Worker loop error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
