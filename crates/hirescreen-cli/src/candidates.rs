//! Candidate command handlers: ingest, extract, rank and dedup.

use std::path::Path;

use hirescreen_core::AppConfig;
use hirescreen_matching::ScoringConfig;
use hirescreen_tasks::ingest::collapse_by_identity;
use hirescreen_tasks::{
    ingest_batch, merge_duplicates, rank_stored, read_sample_file, CandidateIndexer,
    FileReferenceData, RankRequest, ReferenceData,
};
use uuid::Uuid;

use crate::{Context, ScopeArgs};

/// Ingest one sample file, collapsing in-file duplicates first.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub(crate) async fn run_ingest(ctx: &Context, file: &Path, dry_run: bool) -> anyhow::Result<()> {
    let batch = read_sample_file(file).await?;

    if dry_run {
        let received = batch.len();
        let collapsed = collapse_by_identity(batch);
        println!(
            "dry-run: {received} records, {} distinct identities, {} collapsed, {} without identity",
            collapsed.items.len(),
            collapsed.collapsed,
            collapsed.rejected
        );
        return Ok(());
    }

    let indexer = CandidateIndexer::new(ctx.reference.vocabulary());
    let summary = ingest_batch(
        ctx.store.as_ref(),
        &indexer,
        batch,
        ctx.config.ingest_concurrency,
    )
    .await;

    println!(
        "ingested {}: received {}, collapsed {}, inserted {}, updated {}, unchanged {}, failed {}",
        file.display(),
        summary.received,
        summary.collapsed,
        summary.inserted,
        summary.updated,
        summary.unchanged,
        summary.failed
    );
    if summary.failed > 0 {
        anyhow::bail!("{} records failed to ingest", summary.failed);
    }
    Ok(())
}

/// Print the structured index of every record in a sample file as JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub(crate) async fn run_extract(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let reference = FileReferenceData::new(&config.vocabulary_path, &config.presets_path);
    let indexer = CandidateIndexer::new(reference.vocabulary());

    let records: Vec<serde_json::Value> = read_sample_file(file)
        .await?
        .iter()
        .map(|record| {
            serde_json::json!({
                "external_id": record.external_id,
                "structured": indexer.index(&record.content),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

/// Rank stored candidates and print a score table.
///
/// # Errors
///
/// Returns an error for an empty scope, an unknown job or a store failure.
pub(crate) async fn run_rank(
    ctx: &Context,
    scope: ScopeArgs,
    candidate_ids: Vec<Uuid>,
    min_score: Option<u32>,
    top_k: usize,
) -> anyhow::Result<()> {
    let request = RankRequest {
        job_id: scope.job,
        keywords: scope.keywords,
        target_locations: scope.locations,
        candidate_ids,
        min_score,
        top_k: Some(top_k),
    };
    let ranked = rank_stored(
        ctx.store.as_ref(),
        ctx.reference.as_ref(),
        ScoringConfig::default(),
        &request,
    )
    .await?;

    if ranked.is_empty() {
        println!("no candidates matched");
        return Ok(());
    }

    println!("{:<38}{:<7}{:<14}{:<11}SKILLS", "CANDIDATE", "SCORE", "TIER", "SOURCE");
    for result in &ranked {
        println!(
            "{:<38}{:<7}{:<14}{:<11}{}",
            result.resume_id.to_string(),
            result.score,
            result.recommendation.as_str(),
            format!("{:?}", result.source).to_lowercase(),
            result.matched_skills.join(", ")
        );
    }
    Ok(())
}

/// Merge duplicate candidate records.
///
/// # Errors
///
/// Returns an error if the store fails.
pub(crate) async fn run_dedup(ctx: &Context, dry_run: bool) -> anyhow::Result<()> {
    let report = merge_duplicates(ctx.store.as_ref(), dry_run).await?;

    let verb = if dry_run { "would remove" } else { "removed" };
    for group in &report.groups {
        println!(
            "{}: keep {}, {verb} {}",
            group.identity_key,
            group.canonical_id,
            group.removed_ids.len()
        );
    }
    println!(
        "{} records scanned, {} duplicate groups, {verb} {} records",
        report.scanned,
        report.groups.len(),
        report.removed()
    );
    Ok(())
}
