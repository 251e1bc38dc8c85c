//! Recurring maintenance jobs run by the API process.

use std::sync::Arc;

use chrono::Utc;
use hirescreen_core::AppConfig;
use hirescreen_tasks::{merge_duplicates, reconcile_stale_tasks};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::Store;

/// Builds and starts the job scheduler.
///
/// The returned handle must be kept alive; dropping it stops every job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if a cron expression is invalid or the
/// scheduler fails to start.
pub async fn build_scheduler(
    store: Arc<Store>,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_reconcile_job(&scheduler, Arc::clone(&store), &config).await?;
    register_merge_job(&scheduler, store, &config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Fails pending tasks no worker picked up within `stale_task_secs`.
async fn register_reconcile_job(
    scheduler: &JobScheduler,
    store: Arc<Store>,
    config: &AppConfig,
) -> Result<(), JobSchedulerError> {
    let stale_after =
        chrono::Duration::seconds(i64::try_from(config.stale_task_secs).unwrap_or(i64::MAX / 1000));

    let job = Job::new_async(config.reconcile_cron.as_str(), move |_uuid, _lock| {
        let store = Arc::clone(&store);

        Box::pin(async move {
            match reconcile_stale_tasks(&store, Utc::now(), stale_after).await {
                Ok(report) if report.total() > 0 => tracing::warn!(
                    analysis = report.analysis.len(),
                    collection = report.collection.len(),
                    "scheduler: expired stale tasks"
                ),
                Ok(_) => tracing::debug!("scheduler: no stale tasks"),
                Err(e) => tracing::error!(error = %e, "scheduler: stale-task sweep failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Collapses candidate records that share an identity key.
async fn register_merge_job(
    scheduler: &JobScheduler,
    store: Arc<Store>,
    config: &AppConfig,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(config.merge_cron.as_str(), move |_uuid, _lock| {
        let store = Arc::clone(&store);

        Box::pin(async move {
            tracing::info!("scheduler: starting duplicate merge");
            match merge_duplicates(store.as_ref(), false).await {
                Ok(report) => tracing::info!(
                    scanned = report.scanned,
                    groups = report.groups.len(),
                    removed = report.removed(),
                    "scheduler: duplicate merge complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: duplicate merge failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
