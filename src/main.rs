use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use channel_triage::channels::SnapshotTransport;
use channel_triage::config::AppConfig;
use channel_triage::llm::{Criteria, create_classifier};
use channel_triage::pipeline::{Forwarder, TriageService};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    eprintln!("📡 Channel Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Provider: {:?} ({})", config.classifier.backend, config.classifier.model);
    eprintln!(
        "   Folder: {}",
        config.telegram.chat_folder.as_deref().unwrap_or("<none>")
    );
    eprintln!(
        "   Target: {}",
        config.telegram.target_channel.as_deref().unwrap_or("<none>")
    );
    eprintln!("   Threshold: {}\n", config.processing.interest_threshold);

    let criteria = Criteria::load(&config.prompts_path)?;
    info!(
        interesting = criteria.interesting.len(),
        uninteresting = criteria.uninteresting.len(),
        "Loaded criteria"
    );

    let classifier = create_classifier(&config.classifier)?;
    let triage = Arc::new(TriageService::new(
        classifier,
        criteria,
        config.processing.cache_ttl,
    ));

    let transport = Arc::new(SnapshotTransport::load(&config.telegram.snapshot_path).await?);
    let forwarder = Forwarder::new(transport.clone(), triage, config.forwarder_config());

    // ── Shutdown signal ──────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current step");
                shutdown.store(true, Ordering::Relaxed);
            }
        });
    }

    let report = forwarder.run(&shutdown).await?;

    info!(
        candidates = report.candidate_dialogs,
        processed = report.dialogs_processed,
        scored = report.messages_scored,
        unscored = report.messages_unscored,
        skipped = report.messages_skipped,
        forwarded = report.messages_forwarded,
        cancelled = report.cancelled,
        "Triage run finished"
    );
    if report.had_failures() {
        warn!(
            fetch = report.fetch_failures,
            forward = report.forward_failures,
            mark_read = report.mark_read_failures,
            "Some transport operations failed"
        );
    }

    if let Err(e) = transport.save(&config.telegram.snapshot_path).await {
        error!("Failed to write back dialog snapshot: {e}");
        return Err(e.into());
    }

    Ok(())
}
