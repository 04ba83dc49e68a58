use anyhow::{Context, Result};
use chrono::Utc;
use lib_controllog::configs::IntervalSettings;
use lib_controllog::loggers::setup_logging;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod controllog_logic;
use controllog_logic::{config, wiring};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let (config, notes) = config::load_config();

    // Fail before anything else starts when the intervals are unusable.
    let intervals = IntervalSettings::new(config.poll_interval_ms, config.refresh_interval_ms)
        .context("Invalid interval configuration")?;

    let log_dir = config
        .log_dir
        .clone()
        .unwrap_or_else(|| "./logs".into());
    let log_level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    let _guard = setup_logging("server_controllog", &log_dir, &log_level)?;
    for note in notes {
        warn!("{}", note);
    }

    let pipeline = wiring::build_pipeline(&config, intervals).await?;

    // Load the first snapshot before polling so the first tick sees the events.
    match pipeline.refresher.refresh_once(Utc::now()).await {
        Ok(events) => info!(events, "Initial configuration loaded"),
        Err(e) => error!(error = %e, "Initial configuration load failed, starting empty"),
    }

    let cancel = CancellationToken::new();
    let wiring::Pipeline { refresher, poller } = pipeline;

    let refresher_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { refresher.run(cancel).await }
    });
    let poller_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { poller.run(cancel).await }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not install SIGTERM handler");
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    cancel.cancel();

    // Wait for components to shut down
    let _ = tokio::try_join!(refresher_handle, poller_handle);

    info!("Shutdown complete.");
    Ok(())
}
