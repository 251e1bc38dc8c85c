//! Collection worker command.

use std::sync::Arc;

use hirescreen_tasks::{CollectionWorker, WorkerConfig};
use tokio::sync::watch;

use crate::tasks::collection_service;
use crate::Context;

/// Run a collection worker until ctrl-c, or for a single task with `once`.
///
/// # Errors
///
/// With `once`, returns the error that failed the claimed task.
pub(crate) async fn run_worker(ctx: &Context, once: bool) -> anyhow::Result<()> {
    let worker = CollectionWorker::new(
        Arc::clone(&ctx.store),
        Arc::new(collection_service(ctx)),
        WorkerConfig::from_app_config(&ctx.config),
    );

    if once {
        match worker.run_once().await? {
            Some(id) => println!("worker {} handled collection task {id}", worker.worker_id()),
            None => println!("no pending collection tasks"),
        }
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("received ctrl-c, stopping worker");
        let _ = shutdown_tx.send(true);
    });

    worker.run(shutdown_rx).await;
    Ok(())
}
