use hirescreen_db::DbError;
use thiserror::Error;
use uuid::Uuid;

/// Errors from the external analysis collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status with the (truncated) response body.
    #[error("collaborator returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The reply could not be turned into a valid analysis result.
    #[error("unparseable collaborator response: {0}")]
    Unparseable(String),

    #[error("invalid collaborator configuration: {0}")]
    Config(String),
}

impl CollaboratorError {
    /// Timeouts, dropped connections, 429 and 5xx. Anything that reached us
    /// as a reply is final.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Unparseable(_) | Self::Config(_) => false,
        }
    }
}

/// Errors from a candidate harvester.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("harvest source error: {0}")]
    Source(String),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{kind} task {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("job requirement {0} not found")]
    JobNotFound(Uuid),

    #[error("invalid task input: {0}")]
    InvalidInput(String),

    #[error("analysis API key is not configured")]
    MissingApiKey,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Harvest(#[from] HarvestError),
}
