use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub vocabulary_path: PathBuf,
    pub presets_path: PathBuf,
    /// Directory the sample-file harvester reads.
    pub samples_dir: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub analysis_api_key: Option<String>,
    pub analysis_base_url: String,
    pub analysis_model: String,
    pub analysis_timeout_secs: u64,
    pub analysis_max_retries: u32,
    pub prefilter_skip_threshold: f64,
    pub ingest_concurrency: usize,
    pub worker_id: String,
    pub worker_poll_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub worker_freshness_secs: u64,
    pub stale_task_secs: u64,
    pub reconcile_cron: String,
    pub merge_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("vocabulary_path", &self.vocabulary_path)
            .field("presets_path", &self.presets_path)
            .field("samples_dir", &self.samples_dir)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "analysis_api_key",
                &self.analysis_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("analysis_base_url", &self.analysis_base_url)
            .field("analysis_model", &self.analysis_model)
            .field("analysis_timeout_secs", &self.analysis_timeout_secs)
            .field("analysis_max_retries", &self.analysis_max_retries)
            .field("prefilter_skip_threshold", &self.prefilter_skip_threshold)
            .field("ingest_concurrency", &self.ingest_concurrency)
            .field("worker_id", &self.worker_id)
            .field("worker_poll_interval_secs", &self.worker_poll_interval_secs)
            .field("heartbeat_interval_secs", &self.heartbeat_interval_secs)
            .field("worker_freshness_secs", &self.worker_freshness_secs)
            .field("stale_task_secs", &self.stale_task_secs)
            .field("reconcile_cron", &self.reconcile_cron)
            .field("merge_cron", &self.merge_cron)
            .finish()
    }
}
