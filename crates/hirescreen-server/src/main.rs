mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use hirescreen_db::PgStore;
use hirescreen_matching::ScoringConfig;
use hirescreen_tasks::{
    AnalysisCollaborator, AnalysisService, ChatCompletionsCollaborator, CollectionService,
    FileReferenceData, ReferenceData, SampleFileHarvester, TokioScheduler,
};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState, Store},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(hirescreen_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = hirescreen_db::PoolConfig::from_app_config(&config);
    let pool = hirescreen_db::connect_pool(&config.database_url, pool_config).await?;
    hirescreen_db::run_migrations(&pool).await?;

    let store: Arc<Store> = Arc::new(PgStore::new(pool.clone()));
    let reference: Arc<dyn ReferenceData> = Arc::new(FileReferenceData::new(
        &config.vocabulary_path,
        &config.presets_path,
    ));

    let collaborator = ChatCompletionsCollaborator::from_config(&config)?
        .map(|c| Arc::new(c) as Arc<dyn AnalysisCollaborator>);
    if collaborator.is_none() {
        tracing::warn!("no analysis API key configured; AI analysis falls back to rule scoring");
    }

    let analysis = Arc::new(
        AnalysisService::new(
            Arc::clone(&store),
            Arc::clone(&reference),
            Arc::new(TokioScheduler),
        )
        .with_collaborator(collaborator)
        .with_skip_threshold(config.prefilter_skip_threshold),
    );
    let collection = Arc::new(
        CollectionService::new(
            Arc::clone(&store),
            Arc::new(SampleFileHarvester::new(&config.samples_dir)),
            Arc::clone(&reference),
        )
        .with_concurrency(config.ingest_concurrency),
    );

    let _scheduler = scheduler::build_scheduler(Arc::clone(&store), Arc::clone(&config)).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        hirescreen_core::Environment::Development
    ))?;
    let state = AppState {
        store,
        analysis,
        collection,
        reference,
        scoring: ScoringConfig::default(),
        worker_freshness: chrono::Duration::seconds(
            i64::try_from(config.worker_freshness_secs).unwrap_or(i64::MAX / 1000),
        ),
        pool: Some(pool),
    };
    let app = build_app(state, auth);

    tracing::info!(addr = %config.bind_addr, "hirescreen-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
