//! Cron scheduler for the two daily session slots.
//!
//! Slot 1 covers the first three registry hotels, slot 2 the next three.
//! Cron expressions carry seconds and are evaluated in UTC.

use std::sync::Arc;

use ratewatch_core::AppConfig;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::prices::{self, RunArgs};

/// Builds and starts the scheduler with one job per session slot.
///
/// The returned [`JobScheduler`] must be kept alive; dropping it stops the
/// jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if a cron expression is invalid or the
/// scheduler fails to start.
pub(crate) async fn build_scheduler(
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_session_job(&scheduler, 1, &config.schedule_session1_cron, Arc::clone(&config))
        .await?;
    let session2_cron = config.schedule_session2_cron.clone();
    register_session_job(&scheduler, 2, &session2_cron, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_session_job(
    scheduler: &JobScheduler,
    slot: u8,
    cron: &str,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!(slot, "scheduler: starting price run");
            let args = RunArgs {
                session: Some(slot),
                ..RunArgs::default()
            };
            let outcome = prices::run(&config, &args).await;
            if outcome.success {
                tracing::info!(
                    slot,
                    successful = outcome.stats.successful_hotels,
                    failed = outcome.stats.failed_hotels,
                    snapshots = outcome.snapshot_count,
                    "scheduler: price run complete"
                );
            } else {
                tracing::error!(slot, message = %outcome.message, "scheduler: price run failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(slot, cron, "scheduler: registered session job");
    Ok(())
}

/// Runs the scheduler until ctrl-c or SIGTERM.
pub(crate) async fn run_until_shutdown(config: AppConfig) -> anyhow::Result<()> {
    let mut scheduler = build_scheduler(Arc::new(config)).await?;
    shutdown_signal().await;
    scheduler.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
