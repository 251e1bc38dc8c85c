//! Task command handlers.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use futures::future::BoxFuture;
use hirescreen_core::{
    AnalysisKind, AnalysisTaskConfig, CollectionKind, CollectionTaskConfig, TaskKind, TaskOf,
    TaskStatus,
};
use hirescreen_db::{CandidateStore, PgStore, TaskStore};
use hirescreen_tasks::{
    reconcile_stale_tasks, task_summary, AnalysisCollaborator, AnalysisService, CancelOutcome,
    ChatCompletionsCollaborator, CollectionService, EnqueueResult, SampleFileHarvester, Scheduler,
    TaskRunner,
};
use uuid::Uuid;

use crate::{Context, Family, ScopeArgs};

/// Collects dispatched jobs so the command can await them before exiting.
#[derive(Default)]
pub(crate) struct InlineScheduler {
    jobs: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl InlineScheduler {
    /// Runs queued jobs, including any queued while draining.
    pub(crate) async fn drain(&self) {
        loop {
            let jobs = std::mem::take(
                &mut *self.jobs.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if jobs.is_empty() {
                return;
            }
            for job in jobs {
                job.await;
            }
        }
    }
}

impl Scheduler for InlineScheduler {
    fn run_soon(&self, name: &'static str, job: BoxFuture<'static, ()>) {
        tracing::debug!(job = name, "queued for inline run");
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job);
    }
}

pub(crate) fn collection_service(ctx: &Context) -> CollectionService<PgStore> {
    CollectionService::new(
        Arc::clone(&ctx.store),
        Arc::new(SampleFileHarvester::new(&ctx.config.samples_dir)),
        Arc::clone(&ctx.reference),
    )
    .with_concurrency(ctx.config.ingest_concurrency)
}

/// Create an analysis task and run it to completion in this process.
///
/// # Errors
///
/// Returns an error for invalid input or when the task fails.
pub(crate) async fn run_analyze(
    ctx: &Context,
    scope: ScopeArgs,
    mut candidate_ids: Vec<Uuid>,
    use_ai: bool,
) -> anyhow::Result<()> {
    if candidate_ids.is_empty() {
        candidate_ids = ctx
            .store
            .list_candidates()
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
    }

    let collaborator = ChatCompletionsCollaborator::from_config(&ctx.config)?
        .map(|c| Arc::new(c) as Arc<dyn AnalysisCollaborator>);
    let scheduler = Arc::new(InlineScheduler::default());
    let service = Arc::new(
        AnalysisService::new(
            Arc::clone(&ctx.store),
            Arc::clone(&ctx.reference),
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
        )
        .with_collaborator(collaborator)
        .with_skip_threshold(ctx.config.prefilter_skip_threshold),
    );

    let config = AnalysisTaskConfig {
        job_id: scope.job,
        keywords: scope.keywords,
        target_locations: scope.locations,
        candidate_ids,
        use_ai,
    };
    let id = match service.dispatch(config).await? {
        EnqueueResult::Created(id) => id,
        EnqueueResult::Duplicate(id) => {
            println!("identical analysis task {id} is already in flight");
            return Ok(());
        }
    };

    scheduler.drain().await;
    let task = service.runner().get(id).await?;
    println!(
        "analysis task {id}: {} ({}/{} done, {} skipped)",
        task.status, task.progress.done, task.progress.total, task.progress.skipped
    );
    if let Some(summary) = &task.summary {
        println!(
            "analyzed {}, skipped {}, failed {}, high scores {}, average {}",
            summary.analyzed,
            summary.skipped,
            summary.failed,
            summary.high_score_count,
            summary
                .average_score
                .map_or_else(|| "-".to_string(), |s| format!("{s:.1}"))
        );
    }
    if task.status == TaskStatus::Failed {
        anyhow::bail!(
            "analysis failed: {}",
            task.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Enqueue a collection task.
///
/// # Errors
///
/// Returns an error for an invalid keyword or limit, or a store failure.
pub(crate) async fn run_collect(
    ctx: &Context,
    keyword: String,
    location: Option<String>,
    limit: u32,
) -> anyhow::Result<()> {
    let result = collection_service(ctx)
        .dispatch(CollectionTaskConfig {
            keyword,
            location,
            limit,
        })
        .await?;
    match result {
        EnqueueResult::Created(id) => println!("queued collection task {id}"),
        EnqueueResult::Duplicate(id) => println!("collection task {id} is already in flight"),
    }
    Ok(())
}

fn print_task_row<K: TaskKind>(task: &TaskOf<K>) {
    println!(
        "{:<38}{:<12}{:<12}{:<22}{}",
        task.id.to_string(),
        task.status.as_str(),
        format!("{}/{}", task.progress.done, task.progress.total),
        task.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        task.last_status.as_deref().unwrap_or("-")
    );
}

async fn list_family<K>(
    ctx: &Context,
    status: Option<TaskStatus>,
    limit: usize,
) -> anyhow::Result<()>
where
    K: TaskKind,
    PgStore: TaskStore<K>,
{
    let runner = TaskRunner::<K, PgStore>::new(Arc::clone(&ctx.store));
    let tasks = runner.list(status, limit).await?;
    if tasks.is_empty() {
        println!("no {} tasks found", K::NAME);
        return Ok(());
    }
    println!(
        "{:<38}{:<12}{:<12}{:<22}LAST STATUS",
        "ID", "STATUS", "PROGRESS", "CREATED"
    );
    for task in &tasks {
        print_task_row::<K>(task);
    }
    Ok(())
}

/// List recent tasks of one family.
///
/// # Errors
///
/// Returns an error if the store fails.
pub(crate) async fn run_list(
    ctx: &Context,
    family: Family,
    status: Option<TaskStatus>,
    limit: usize,
) -> anyhow::Result<()> {
    match family {
        Family::Analysis => list_family::<AnalysisKind>(ctx, status, limit).await,
        Family::Collection => list_family::<CollectionKind>(ctx, status, limit).await,
    }
}

/// Request cancellation of one task.
///
/// # Errors
///
/// Returns an error for an unknown task or a store failure.
pub(crate) async fn run_cancel(ctx: &Context, family: Family, id: Uuid) -> anyhow::Result<()> {
    let outcome = match family {
        Family::Analysis => {
            TaskRunner::<AnalysisKind, PgStore>::new(Arc::clone(&ctx.store))
                .cancel(id)
                .await?
        }
        Family::Collection => {
            TaskRunner::<CollectionKind, PgStore>::new(Arc::clone(&ctx.store))
                .cancel(id)
                .await?
        }
    };
    match outcome {
        CancelOutcome::Cancelled => println!("task {id} cancelled"),
        CancelOutcome::AlreadyFinished(status) => {
            println!("task {id} already finished with status {status}");
        }
    }
    Ok(())
}

/// Print per-status counts and the latest tasks of both families.
///
/// # Errors
///
/// Returns an error if the store fails.
pub(crate) async fn run_summary(ctx: &Context, latest: usize) -> anyhow::Result<()> {
    let summary = task_summary(&ctx.store, latest).await?;

    for (name, total, by_status) in [
        ("analysis", summary.analysis.total, &summary.analysis.by_status),
        ("collection", summary.collection.total, &summary.collection.by_status),
    ] {
        let counts: Vec<String> = by_status
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(status, n)| format!("{status}={n}"))
            .collect();
        println!("{name}: {total} tasks [{}]", counts.join(", "));
    }

    if !summary.analysis.latest.is_empty() {
        println!("\nlatest analysis tasks:");
        for task in &summary.analysis.latest {
            print_task_row::<AnalysisKind>(task);
        }
    }
    if !summary.collection.latest.is_empty() {
        println!("\nlatest collection tasks:");
        for task in &summary.collection.latest {
            print_task_row::<CollectionKind>(task);
        }
    }
    Ok(())
}

/// Fail pending tasks older than `stale_task_secs`.
///
/// # Errors
///
/// Returns an error if the store fails.
pub(crate) async fn run_reconcile(ctx: &Context) -> anyhow::Result<()> {
    let stale_after = chrono::Duration::seconds(
        i64::try_from(ctx.config.stale_task_secs).unwrap_or(i64::MAX / 1000),
    );
    let report = reconcile_stale_tasks(&ctx.store, Utc::now(), stale_after).await?;

    for id in &report.analysis {
        println!("expired analysis task {id}");
    }
    for id in &report.collection {
        println!("expired collection task {id}");
    }
    println!("{} stale tasks expired", report.total());
    Ok(())
}
