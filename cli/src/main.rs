use std::fs;
use std::sync::Arc;

use anyhow::Context;
use file_monitor::{DirectoryMonitor, EventLog, EventSink, StatsReport};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod settings;

use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load();
    fs::create_dir_all(&settings.watch_dir)
        .with_context(|| format!("creating {}", settings.watch_dir.display()))?;

    info!("Watching {}", settings.watch_dir.display());
    info!("Check interval: {:?}", settings.check_interval);

    let event_log = Arc::new(
        EventLog::open(&settings.log_dir, settings.max_log_size)
            .context("failed to open event log")?,
    );
    note(&event_log, "File monitor started");

    let monitor = DirectoryMonitor::new(settings.monitor_config(), event_log.clone());
    if let Err(e) = monitor.start().await {
        note(&event_log, &format!("Failed to start monitoring: {e}"));
        return Err(e).context("failed to start monitoring");
    }

    let mut stats_ticker = time::interval_at(
        Instant::now() + settings.stats_interval,
        settings.stats_interval,
    );
    stats_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    println!("Monitoring. Press Ctrl+C to stop.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let terminate = terminate_signal();
    tokio::pin!(terminate);

    loop {
        tokio::select! {
            _ = stats_ticker.tick() => {
                let report = StatsReport::generate(&monitor).await;
                match report.save(&settings.log_dir) {
                    Ok(_) => note(
                        &event_log,
                        &format!(
                            "Statistics: {} files, {}",
                            report.file_count, report.total_size_human
                        ),
                    ),
                    Err(e) => note(&event_log, &format!("Failed to save statistics: {e}")),
                }
            }
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    error!("Failed to listen for Ctrl+C: {e}");
                }
                println!("\nInterrupt received, shutting down...");
                note(&event_log, "File monitor shutting down");
                break;
            }
            () = &mut terminate => {
                note(&event_log, "Received SIGTERM, file monitor shutting down");
                break;
            }
        }
    }

    monitor.shutdown().await?;

    let report = StatsReport::generate(&monitor).await;
    match report.save(&settings.log_dir) {
        Ok(path) => println!(
            "Final report: {} files, {} ({})",
            report.file_count,
            report.total_size_human,
            path.display()
        ),
        Err(e) => note(&event_log, &format!("Failed to save final report: {e}")),
    }

    Ok(())
}

/// Resolves on SIGTERM. Never resolves where there is no SIGTERM or the
/// handler cannot be installed.
#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}

/// Write a line to the event log, falling back to tracing.
fn note(event_log: &EventLog, message: &str) {
    info!("{message}");
    if let Err(e) = event_log.log(message) {
        warn!("Failed to write event log: {e}");
    }
}
