mod candidates;
mod tasks;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use hirescreen_core::AppConfig;
use hirescreen_db::PgStore;
use hirescreen_tasks::{FileReferenceData, ReferenceData};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "hirescreen-cli")]
#[command(about = "Candidate screening command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Ingest a harvested sample file into the candidate store
    Ingest {
        file: PathBuf,
        /// Report identity collapse without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the structured signals extracted from a sample file
    Extract { file: PathBuf },
    /// Rank stored candidates against a job or keywords
    Rank {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Restrict ranking to these candidates (repeatable)
        #[arg(long = "candidate")]
        candidate_ids: Vec<Uuid>,
        #[arg(long)]
        min_score: Option<u32>,
        #[arg(long, default_value = "20")]
        top_k: usize,
    },
    /// Merge candidate records that share an identity key
    Dedup {
        /// Report the merge plan without changing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Create an analysis task and run it in this process
    Analyze {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Candidates to analyze (repeatable); every stored candidate when omitted
        #[arg(long = "candidate")]
        candidate_ids: Vec<Uuid>,
        /// Score with the external collaborator instead of the rule model
        #[arg(long)]
        use_ai: bool,
    },
    /// Inspect and cancel tasks
    Tasks {
        #[command(subcommand)]
        command: TasksCommands,
    },
    /// Enqueue a collection task for a worker to pick up
    Collect {
        keyword: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Run a collection worker until interrupted
    Worker {
        /// Process at most one task, then exit
        #[arg(long)]
        once: bool,
    },
    /// Fail pending tasks that no worker picked up in time
    Reconcile,
}

/// Job scope shared by `rank` and `analyze`.
#[derive(Debug, Clone, clap::Args)]
struct ScopeArgs {
    /// Stored job requirement to score against
    #[arg(long)]
    job: Option<Uuid>,
    /// Ad-hoc keyword (repeatable) used when no job is given
    #[arg(long = "keyword")]
    keywords: Vec<String>,
    /// Target location (repeatable)
    #[arg(long = "location")]
    locations: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum TasksCommands {
    /// List recent tasks of one family
    List {
        #[arg(value_enum)]
        family: Family,
        #[arg(long)]
        status: Option<hirescreen_core::TaskStatus>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Request cancellation of a task
    Cancel {
        #[arg(value_enum)]
        family: Family,
        id: Uuid,
    },
    /// Per-status counts and the latest tasks of both families
    Summary {
        #[arg(long, default_value = "5")]
        latest: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Family {
    Analysis,
    Collection,
}

/// Opened store and reference data shared by the command handlers.
struct Context {
    config: AppConfig,
    store: Arc<PgStore>,
    reference: Arc<dyn ReferenceData>,
}

async fn open_context(config: AppConfig) -> anyhow::Result<Context> {
    let pool_config = hirescreen_db::PoolConfig::from_app_config(&config);
    let pool = hirescreen_db::connect_pool(&config.database_url, pool_config).await?;
    let reference: Arc<dyn ReferenceData> = Arc::new(FileReferenceData::new(
        &config.vocabulary_path,
        &config.presets_path,
    ));
    Ok(Context {
        config,
        store: Arc::new(PgStore::new(pool)),
        reference,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("hirescreen-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = hirescreen_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Commands::Extract { file } = &command {
        return candidates::run_extract(&config, file).await;
    }

    let ctx = open_context(config).await?;
    match command {
        Commands::Migrate => {
            let applied = hirescreen_db::run_migrations(ctx.store.pool()).await?;
            println!("migrations applied: {applied}");
        }
        Commands::Ingest { file, dry_run } => candidates::run_ingest(&ctx, &file, dry_run).await?,
        // Handled above without a database connection.
        Commands::Extract { .. } => {}
        Commands::Rank {
            scope,
            candidate_ids,
            min_score,
            top_k,
        } => candidates::run_rank(&ctx, scope, candidate_ids, min_score, top_k).await?,
        Commands::Dedup { dry_run } => candidates::run_dedup(&ctx, dry_run).await?,
        Commands::Analyze {
            scope,
            candidate_ids,
            use_ai,
        } => tasks::run_analyze(&ctx, scope, candidate_ids, use_ai).await?,
        Commands::Tasks { command } => match command {
            TasksCommands::List {
                family,
                status,
                limit,
            } => tasks::run_list(&ctx, family, status, limit).await?,
            TasksCommands::Cancel { family, id } => tasks::run_cancel(&ctx, family, id).await?,
            TasksCommands::Summary { latest } => tasks::run_summary(&ctx, latest).await?,
        },
        Commands::Collect {
            keyword,
            location,
            limit,
        } => tasks::run_collect(&ctx, keyword, location, limit).await?,
        Commands::Worker { once } => worker::run_worker(&ctx, once).await?,
        Commands::Reconcile => tasks::run_reconcile(&ctx).await?,
    }

    Ok(())
}
