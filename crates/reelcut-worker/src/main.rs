//! Highlight pipeline binary.

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};

use reelcut_media::{check_ffmpeg, check_ffprobe};
use reelcut_worker::{init_tracing, HighlightPipeline, PipelineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing().context("Failed to initialize tracing")?;

    info!("Starting reelcut-worker");

    let config = PipelineConfig::from_env().context("Invalid configuration")?;
    info!("Pipeline config: {:?}", config);

    check_ffmpeg()?;
    check_ffprobe()?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, cancelling run");
            let _ = cancel_tx.send(true);
        }
    });

    let pipeline = HighlightPipeline::from_config(&config, cancel_rx.clone())
        .await
        .context("Failed to build pipeline")?;
    let summary = pipeline.run(cancel_rx).await.context("Pipeline run failed")?;

    info!(
        run_id = %summary.run_id,
        selected = summary.selected,
        succeeded = summary.succeeded,
        failed = summary.failed,
        output_dir = %config.composer.output_dir.display(),
        "Run finished"
    );

    if summary.was_cancelled() {
        anyhow::bail!("Run cancelled before all clips were rendered");
    }
    if summary.selected > 0 && summary.succeeded == 0 {
        anyhow::bail!("No clips were produced");
    }
    Ok(())
}
