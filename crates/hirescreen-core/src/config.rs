use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can feed a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("HIRESCREEN_ENV", "development"))?;

    let bind_addr = parse_addr("HIRESCREEN_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("HIRESCREEN_LOG_LEVEL", "info");
    let vocabulary_path = PathBuf::from(or_default(
        "HIRESCREEN_VOCABULARY_PATH",
        "./config/vocabulary.yaml",
    ));
    let presets_path = PathBuf::from(or_default(
        "HIRESCREEN_PRESETS_PATH",
        "./config/filter_presets.yaml",
    ));
    let samples_dir = PathBuf::from(or_default("HIRESCREEN_SAMPLES_DIR", "./samples"));

    let db_max_connections = parse_u32("HIRESCREEN_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("HIRESCREEN_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("HIRESCREEN_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let analysis_api_key = lookup("HIRESCREEN_ANALYSIS_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let analysis_base_url = or_default(
        "HIRESCREEN_ANALYSIS_BASE_URL",
        "https://api.openai.com/v1",
    );
    let analysis_model = or_default("HIRESCREEN_ANALYSIS_MODEL", "gpt-4o-mini");
    let analysis_timeout_secs = parse_u64("HIRESCREEN_ANALYSIS_TIMEOUT_SECS", "60")?;
    let analysis_max_retries = parse_u32("HIRESCREEN_ANALYSIS_MAX_RETRIES", "3")?;

    let prefilter_skip_threshold = {
        let var = "HIRESCREEN_PREFILTER_SKIP_THRESHOLD";
        let value = or_default(var, "0.2")
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(var, format!("{value} is outside [0, 1]")));
        }
        value
    };

    let ingest_concurrency = parse_usize("HIRESCREEN_INGEST_CONCURRENCY", "8")?;
    if ingest_concurrency == 0 {
        return Err(invalid(
            "HIRESCREEN_INGEST_CONCURRENCY",
            "must be at least 1".to_string(),
        ));
    }

    let worker_id = lookup("HIRESCREEN_WORKER_ID")
        .ok()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("worker-{}", std::process::id()));
    let worker_poll_interval_secs = parse_u64("HIRESCREEN_WORKER_POLL_INTERVAL_SECS", "5")?;
    let heartbeat_interval_secs = parse_u64("HIRESCREEN_HEARTBEAT_INTERVAL_SECS", "15")?;
    let worker_freshness_secs = parse_u64("HIRESCREEN_WORKER_FRESHNESS_SECS", "60")?;
    let stale_task_secs = parse_u64("HIRESCREEN_STALE_TASK_SECS", "900")?;
    let reconcile_cron = or_default("HIRESCREEN_RECONCILE_CRON", "0 */5 * * * *");
    let merge_cron = or_default("HIRESCREEN_MERGE_CRON", "0 30 3 * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        vocabulary_path,
        presets_path,
        samples_dir,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        analysis_api_key,
        analysis_base_url,
        analysis_model,
        analysis_timeout_secs,
        analysis_max_retries,
        prefilter_skip_threshold,
        ingest_concurrency,
        worker_id,
        worker_poll_interval_secs,
        heartbeat_interval_secs,
        worker_freshness_secs,
        stale_task_secs,
        reconcile_cron,
        merge_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "HIRESCREEN_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
